//! CLI command implementations.

pub mod category;
pub mod product;

use std::io::Write;

use catalog_client::CatalogError;
use serde::Serialize;
use thiserror::Error;

/// Errors from a CLI command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

/// Print `value` as pretty JSON on stdout. `None` prints `null`.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CommandError> {
    let encoded = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{encoded}")?;
    Ok(())
}
