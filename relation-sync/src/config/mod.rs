//! Configuration and dependency initialization for relation sync.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{ConnectionMode, Settings};
