//! Catalog CLI - browse a catalog backend through the caching client.
//!
//! # Usage
//!
//! ```bash
//! # Print the whole category tree
//! catalog tree
//!
//! # Print one category
//! catalog category shoes
//!
//! # List the products of a category, sorted by price
//! catalog products shoes --sort-field price --desc
//!
//! # Print one product and its neighbours
//! catalog product shoes/runner
//! catalog next shoes/runner --wrap
//! catalog previous shoes/runner
//! ```
//!
//! Configuration is read from `CATALOG_*` environment variables (and a
//! `.env` file if present). Setting `SENTRY_DSN` reports warnings and
//! errors to Sentry.

#![cfg_attr(not(test), forbid(unsafe_code))]

use catalog_client::{CatalogConfig, CatalogService, Direction};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod telemetry;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(author, version, about = "Catalog browsing tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the category tree
    Tree,
    /// Print one category
    Category {
        /// Category identity
        id: String,
    },
    /// List the products of a category
    Products {
        /// Category identity
        category: String,

        /// Sort on this product field
        #[arg(long)]
        sort_field: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort_field")]
        desc: bool,

        /// Page size
        #[arg(long)]
        size: Option<u64>,

        /// Page offset
        #[arg(long)]
        from: Option<u64>,
    },
    /// List products by identity
    ProductsById {
        /// Product identities
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print one product
    Product {
        /// Product identity
        id: String,
    },
    /// Print the product after the given one in its category
    Next {
        /// Product identity
        id: String,

        /// Continue at the start of the category
        #[arg(long)]
        wrap: bool,
    },
    /// Print the product before the given one in its category
    Previous {
        /// Product identity
        id: String,

        /// Continue at the end of the category
        #[arg(long)]
        wrap: bool,
    },
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = telemetry::init_sentry(&telemetry::TelemetryConfig::from_env());

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "catalog_client=info,catalog_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CatalogConfig::from_env()?;
    tracing::debug!(backend = ?config.backend, "Configuration loaded");
    let catalog = CatalogService::from_config(&config)?;

    match cli.command {
        Commands::Tree => commands::category::tree(&catalog).await?,
        Commands::Category { id } => commands::category::show(&catalog, &id).await?,
        Commands::Products {
            category,
            sort_field,
            desc,
            size,
            from,
        } => {
            let listing = commands::product::Listing {
                sort_field,
                descending: desc,
                size,
                from,
            };
            commands::product::list(&catalog, &category, &listing).await?;
        }
        Commands::ProductsById { ids } => commands::product::list_by_id(&catalog, ids).await?,
        Commands::Product { id } => commands::product::show(&catalog, &id).await?,
        Commands::Next { id, wrap } => {
            commands::product::neighbour(&catalog, &id, Direction::Next, wrap)
                .await?;
        }
        Commands::Previous { id, wrap } => {
            commands::product::neighbour(&catalog, &id, Direction::Previous, wrap)
                .await?;
        }
    }
    Ok(())
}
