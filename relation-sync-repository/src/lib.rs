//! # Relation Sync Repository
//!
//! This crate provides traits and implementations for the storage that relation
//! sync talks to: the document store that receives derived writes, the change
//! log that feeds observed mutations, and the cursor that records how far the
//! change log has been consumed. It includes a PostgreSQL implementation of each
//! and in-memory implementations used as substitution fakes in tests.

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;
pub mod types;

pub use errors::{FeedError, StoreError};
pub use interfaces::{ChangeLogRepository, CursorRepository, DocumentStore};
pub use memory::{InMemoryChangeLog, InMemoryCursorRepository, InMemoryDocumentStore};
pub use postgres::{
    run_migrations, PostgresChangeLog, PostgresCursorRepository, PostgresDocumentStore,
};
pub use types::ChangeRecord;
