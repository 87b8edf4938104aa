//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Starting downloads, progress polling, metadata probing
//! - [`files`] - Stored file retrieval
//! - [`system`] - Health, events, OpenAPI

mod downloads;
mod files;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use downloads::*;
pub use files::*;
pub use system::*;
