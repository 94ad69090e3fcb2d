//! In-memory implementations of the repository interfaces.
//!
//! These are full substitution fakes: they honour the same atomicity and
//! conditional-update rules as the PostgreSQL implementations and are what the
//! service tests run against.

mod change_log;
mod cursor_repository;
mod document_store;

pub use change_log::InMemoryChangeLog;
pub use cursor_repository::InMemoryCursorRepository;
pub use document_store::InMemoryDocumentStore;
