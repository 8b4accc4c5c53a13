//! Per-run log sink.
//!
//! Every message goes to the process log through `tracing` and is appended
//! as one line to the run's own file under the log directory.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use sheetrun_core::{Category, LogLevel, LogLine, RunId};

/// A run log file could not be created or appended to.
#[derive(Debug, Error)]
#[error("Failed to write run log '{}': {source}", path.display())]
pub struct LogWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Append-only log of a single run.
#[derive(Debug)]
pub struct RunLogger {
    path: PathBuf,
    category: Category,
    run_id: RunId,
}

impl RunLogger {
    /// Open the log of `run_id`, creating `log_dir` if needed.
    ///
    /// The file is `log-<date>-<category>-<run_id>.txt`; it is created by the
    /// first line written.
    pub async fn open(
        log_dir: &Path,
        category: Category,
        run_id: RunId,
    ) -> Result<Self, LogWriteError> {
        tokio::fs::create_dir_all(log_dir)
            .await
            .map_err(|source| LogWriteError {
                path: log_dir.to_path_buf(),
                source,
            })?;

        let date = chrono::Local::now().format("%Y-%m-%d");
        let path = log_dir.join(format!("log-{}-{}-{}.txt", date, category, run_id));

        Ok(Self {
            path,
            category,
            run_id,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub async fn info(&self, message: impl AsRef<str>) -> Result<(), LogWriteError> {
        self.write(LogLine::info(message)).await
    }

    pub async fn warn(&self, message: impl AsRef<str>) -> Result<(), LogWriteError> {
        self.write(LogLine::warn(message)).await
    }

    pub async fn error(&self, message: impl AsRef<str>) -> Result<(), LogWriteError> {
        self.write(LogLine::error(message)).await
    }

    /// Emit `line` to the console and append it to the run file.
    ///
    /// The file is opened and closed for every line.
    pub async fn write(&self, line: LogLine) -> Result<(), LogWriteError> {
        let run_id = self.run_id.as_str();
        let category = self.category.as_str();
        match line.level {
            LogLevel::Info => info!(run_id, category, "{}", line.message),
            LogLevel::Warn => warn!(run_id, category, "{}", line.message),
            LogLevel::Error => error!(run_id, category, "{}", line.message),
        }

        let mut text = line.to_file_line();
        text.push('\n');
        self.append(text.as_bytes())
            .await
            .map_err(|source| LogWriteError {
                path: self.path.clone(),
                source,
            })
    }

    async fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}
