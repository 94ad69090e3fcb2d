//! # Relation Sync
//!
//! Reacts to mutations on groups and notifications and keeps the derived
//! relationship sets on user profiles and group membership lists up to date.
//!
//! ## Architecture
//!
//! The service follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Polls change events from the change log
//! 2. **Processor**: Classifies each event and derives the union writes it requires
//! 3. **Loader**: Applies each event's writes as one atomic batch
//! 4. **Orchestrator**: Coordinates the flow, acknowledges batches and handles shutdown
//!
//! Delivery is at-least-once. Every derived write is a set insertion, so
//! reprocessing an event leaves the store unchanged.
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`consumer`]: Change feed consumer
//! - [`processor`]: Reaction dispatcher and reactors
//! - [`loader`]: Idempotent write applier
//! - [`orchestrator`]: Coordinates the flow
//! - [`errors`]: Error types for the service

pub mod config;
pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::{Dependencies, Settings};
pub use errors::{IngestError, ReactionError};

use thiserror::Error;

/// Errors that can occur during service initialization or execution.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl SyncError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
