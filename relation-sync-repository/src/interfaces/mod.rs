//! This module defines and re-exports the interfaces for the relation sync repository.
mod change_log;
mod cursor_repository;
mod document_store;

pub use change_log::ChangeLogRepository;
pub use cursor_repository::CursorRepository;
pub use document_store::DocumentStore;
