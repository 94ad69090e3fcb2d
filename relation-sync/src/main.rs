//! Relation Sync Main Entry Point
//!
//! Consumes group and notification changes from the change log and keeps
//! user relationship sets in sync.

use dotenv::dotenv;
use relation_sync::{Dependencies, SyncError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
///
/// `LOG_FORMAT=json` selects structured JSON output; anything else gives
/// pretty console output.
fn init_tracing() -> Result<(), SyncError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("relation_sync=info,relation_sync_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| SyncError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "relation-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| SyncError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "relation-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    dotenv().ok();

    init_tracing()?;

    info!("Starting relation sync");

    let mut deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.orchestrator.run().await {
        Ok(()) => {
            info!("Relation sync stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Relation sync failed");
            Err(e.into())
        }
    }
}
