//! Sentry error tracking for the CLI.
//!
//! # Environment Variables
//!
//! - `SENTRY_DSN` - Enables reporting when set
//! - `SENTRY_ENVIRONMENT` - Environment tag (e.g. `staging`)
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)

use catalog_client::{ConfigProvider, EnvConfig};

/// Sentry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
}

impl TelemetryConfig {
    /// Load settings from the environment.
    pub fn from_env() -> Self {
        Self::from_provider(&EnvConfig)
    }

    /// Load settings from any option provider. Unparseable rates fall back
    /// to sampling everything.
    pub fn from_provider(provider: &impl ConfigProvider) -> Self {
        Self {
            sentry_dsn: provider.get("SENTRY_DSN"),
            sentry_environment: provider.get("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: provider
                .get("SENTRY_SAMPLE_RATE")
                .and_then(|rate| rate.parse::<f32>().ok())
                .filter(|rate| (0.0..=1.0).contains(rate))
                .unwrap_or(1.0),
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
pub fn init_sentry(config: &TelemetryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}
