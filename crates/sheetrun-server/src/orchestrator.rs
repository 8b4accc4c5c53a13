//! Run orchestration: one upload-process-respond lifecycle per request.

use std::error::Error as _;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use sheetrun_core::{FailureKind, ModuleSpec, ProcessResult, RunId};

use crate::config::{ServerConfig, UploadLayout};
use crate::delegate::{DelegateError, DelegateOutput, ProcessingDelegate, RoleInputs};
use crate::gate::RunGate;
use crate::ingest::{FileIngestion, IngestError, Uploads};
use crate::logger::{LogWriteError, RunLogger};

const BANNER: &str = "======================================";

/// Why a run stopped before producing an artifact.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Log(#[from] LogWriteError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Delegate(#[from] DelegateError),

    #[error("Processor timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl RunError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Log(_) => FailureKind::Log,
            Self::Ingest(_) => FailureKind::Ingestion,
            Self::Delegate(_) => FailureKind::Delegate,
            Self::Timeout(_) => FailureKind::Timeout,
        }
    }
}

/// Drives runs: identity, logging, ingestion, processing, result packaging.
///
/// Holds no per-run state; any number of runs may be in flight.
#[derive(Debug)]
pub struct Orchestrator {
    upload_dir: PathBuf,
    output_dir: PathBuf,
    log_dir: PathBuf,
    layout: UploadLayout,
    delegate_timeout: Duration,
    gate: RunGate,
}

impl Orchestrator {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
            log_dir: config.log_dir.clone(),
            layout: config.upload_layout,
            delegate_timeout: config.delegate_timeout(),
            gate: RunGate::new(),
        }
    }

    /// Run `module` over `uploads`.
    ///
    /// Never fails: every error becomes a `ProcessResult::Failed` after being
    /// written to the run log.
    pub async fn process_run(
        &self,
        module: &ModuleSpec,
        delegate: &dyn ProcessingDelegate,
        uploads: Uploads,
    ) -> ProcessResult {
        let run_id = RunId::generate();
        let started = Instant::now();

        let logger = match RunLogger::open(&self.log_dir, module.name.clone(), run_id.clone()).await
        {
            Ok(logger) => logger,
            Err(e) => {
                error!(run_id = %run_id, category = %module.name, error = %e, "Failed to open run log");
                return ProcessResult::failed(FailureKind::Log, e.to_string());
            }
        };

        let outcome = self.execute(module, delegate, uploads, &logger).await;
        if self.layout == UploadLayout::RunScoped {
            discard_uploads(&self.upload_dir_for(module, &run_id), &run_id).await;
        }

        match outcome {
            Ok((artifact, logs)) => {
                info!(
                    run_id = %run_id,
                    category = %module.name,
                    artifact = %artifact,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Run succeeded"
                );
                ProcessResult::succeeded(artifact, logs)
            }
            Err(e) => {
                report_failure(&logger, &e).await;
                ProcessResult::failed(e.kind(), e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        module: &ModuleSpec,
        delegate: &dyn ProcessingDelegate,
        mut uploads: Uploads,
        logger: &RunLogger,
    ) -> Result<(String, Vec<String>), RunError> {
        logger.info(BANNER).await?;
        logger
            .info(format!("Starting processing for {}", module.title))
            .await?;
        logger.info(BANNER).await?;

        let upload_dir = self.upload_dir_for(module, logger.run_id());
        let _gate = match self.layout {
            UploadLayout::RunScoped => None,
            UploadLayout::Shared => Some(self.gate.acquire(&module.name).await),
        };

        let ingestion = FileIngestion::new(upload_dir, logger);
        let mut inputs = RoleInputs::new();
        for role in &module.roles {
            let mut source = uploads
                .take(&role.field)
                .ok_or_else(|| IngestError::Missing(role.field.clone()))?;
            let path = ingestion.save(role, &mut source).await?;
            inputs.push(role.field.clone(), path);
        }

        let output = tokio::time::timeout(
            self.delegate_timeout,
            delegate.process(&inputs, &self.output_dir),
        )
        .await
        .map_err(|_| RunError::Timeout(self.delegate_timeout))??;

        let DelegateOutput { artifact, logs } = output;
        let artifact = artifact
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or(DelegateError::NoArtifact)?;

        for line in &logs {
            logger.info(line).await?;
        }
        logger.info("Processing finished successfully.").await?;

        Ok((artifact, logs))
    }

    /// Where the uploads of a run are written.
    fn upload_dir_for(&self, module: &ModuleSpec, run_id: &RunId) -> PathBuf {
        let category_dir = self.upload_dir.join(module.name.as_str());
        match self.layout {
            UploadLayout::RunScoped => category_dir.join(run_id.as_str()),
            UploadLayout::Shared => category_dir,
        }
    }
}

/// Remove a finished run's upload directory.
async fn discard_uploads(dir: &Path, run_id: &RunId) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(run_id = %run_id, path = %dir.display(), "Removed run uploads"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            run_id = %run_id,
            path = %dir.display(),
            error = %e,
            "Failed to remove run uploads"
        ),
    }
}

/// Write the error and its source chain to the run log.
async fn report_failure(logger: &RunLogger, err: &RunError) {
    warn!(
        run_id = %logger.run_id(),
        kind = err.kind().as_str(),
        error = %err,
        "Run failed"
    );

    let mut lines = vec![format!("Run failed: {}", err)];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }

    for line in lines {
        if let Err(e) = logger.error(&line).await {
            warn!(run_id = %logger.run_id(), error = %e, "Failed to record run failure");
            break;
        }
    }
}
