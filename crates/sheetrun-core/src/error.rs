//! Core domain errors.

use thiserror::Error;

/// Core domain errors for SheetRun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Category label contains characters unsafe for paths or URLs.
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Upload role is malformed.
    #[error("Invalid upload role '{field}': {reason}")]
    InvalidRole { field: String, reason: String },

    /// Two roles of one module share a field or a file name.
    #[error("Duplicate upload role in module '{module}': {field}")]
    DuplicateRole { module: String, field: String },
}
