//! Price coercion for backend payloads.
//!
//! Legacy backends send prices as strings (`"19.99"`), search backends as
//! JSON numbers. Both are normalized to a `Decimal` so sorting and
//! comparisons work on real numbers.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Coerce a raw JSON price into a decimal.
///
/// Accepts numbers and numeric strings (surrounding whitespace ignored).
/// Anything else, including empty strings and `null`, yields `None`.
#[must_use]
pub fn coerce_price(raw: &Value) -> Option<Decimal> {
    match raw {
        Value::String(s) => parse_price(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        _ => None,
    }
}

/// Parse a price string such as `"19.99"` or `"1e2"`.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_string_price() {
        assert_eq!(coerce_price(&json!("19.99")), Some(Decimal::new(1999, 2)));
        assert_eq!(coerce_price(&json!(" 5 ")), Some(Decimal::from(5)));
    }

    #[test]
    fn test_coerce_numeric_price() {
        assert_eq!(coerce_price(&json!(42)), Some(Decimal::from(42)));
        assert_eq!(coerce_price(&json!(2.5)), Some(Decimal::new(25, 1)));
    }

    #[test]
    fn test_coerce_rejects_garbage() {
        assert_eq!(coerce_price(&json!("")), None);
        assert_eq!(coerce_price(&json!("free")), None);
        assert_eq!(coerce_price(&Value::Null), None);
        assert_eq!(coerce_price(&json!({"amount": 1})), None);
    }
}
