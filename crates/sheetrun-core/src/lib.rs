//! SheetRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - HTTP transport
//! - Filesystem access
//! - Runtime specifics
//!
//! All types here describe a processing run: who it is, which files it
//! needs, what it logs and how it ends.

pub mod error;
pub mod ids;
pub mod log;
pub mod module;
pub mod result;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{Category, RunId};
pub use log::{LogLevel, LogLine};
pub use module::{ModuleSpec, UploadRole};
pub use result::{FailureKind, ProcessResult};
