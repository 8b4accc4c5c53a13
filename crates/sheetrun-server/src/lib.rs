//! SheetRun Server Library
//!
//! Accepts spreadsheet uploads for a processing module, runs the module's
//! processor over them and serves the resulting artifact for download.
//! Every run gets its own log file.

pub mod artifacts;
pub mod config;
pub mod delegate;
pub mod gate;
pub mod http;
pub mod ingest;
pub mod logger;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{Artifact, ArtifactError, ArtifactStore};
pub use config::{ServerConfig, UploadLayout};
pub use delegate::{CommandDelegate, DelegateError, DelegateOutput, ProcessingDelegate, RoleInputs};
pub use ingest::{FileIngestion, IngestError, UploadSource, Uploads};
pub use logger::{LogWriteError, RunLogger};
pub use orchestrator::{Orchestrator, RunError};
pub use registry::{Module, ModuleRegistry};
pub use state::AppState;
