//! HTTP request and response types.

use serde::{Deserialize, Serialize};

use sheetrun_core::ProcessResult;

// ============================================================================
// Processing types
// ============================================================================

/// Response body for `POST /{module}/process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    pub logs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ProcessResult> for ProcessResponse {
    fn from(result: ProcessResult) -> Self {
        match result {
            ProcessResult::Succeeded {
                download_url, logs, ..
            } => Self {
                success: true,
                download_url: Some(download_url),
                logs,
                error: None,
            },
            ProcessResult::Failed { error, logs, .. } => Self {
                success: false,
                download_url: None,
                logs,
                error: Some(error),
            },
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
