//! Outcome of a processing run.

use serde::{Deserialize, Serialize};

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An upload could not be persisted.
    Ingestion,
    /// The processor reported a failure.
    Delegate,
    /// The processor did not finish in time.
    Timeout,
    /// The run log could not be written.
    Log,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Delegate => "delegate",
            Self::Timeout => "timeout",
            Self::Log => "log",
        }
    }
}

/// Result of one run, as handed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessResult {
    Succeeded {
        /// File name of the artifact inside the output directory.
        artifact: String,
        /// Relative URL the artifact can be downloaded from.
        download_url: String,
        /// Log lines reported by the processor, in order.
        logs: Vec<String>,
    },
    Failed {
        kind: FailureKind,
        error: String,
        logs: Vec<String>,
    },
}

impl ProcessResult {
    /// Successful run producing `artifact`.
    pub fn succeeded(artifact: impl Into<String>, logs: Vec<String>) -> Self {
        let artifact = artifact.into();
        Self::Succeeded {
            download_url: format!("/download/{}", artifact),
            artifact,
            logs,
        }
    }

    /// Failed run; the error message is the only log line.
    pub fn failed(kind: FailureKind, error: impl Into<String>) -> Self {
        let error = error.into();
        Self::Failed {
            kind,
            logs: vec![error.clone()],
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn logs(&self) -> &[String] {
        match self {
            Self::Succeeded { logs, .. } | Self::Failed { logs, .. } => logs,
        }
    }

    pub fn download_url(&self) -> Option<&str> {
        match self {
            Self::Succeeded { download_url, .. } => Some(download_url),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}
