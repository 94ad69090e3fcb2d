//! Error types for the relation sync repository.
//!
//! [`StoreError`] covers document store operations and [`FeedError`] covers the
//! change log and its cursor.

mod feed_error;
mod store_error;

pub use feed_error::FeedError;
pub use store_error::StoreError;
