//! The processing step a module delegates its work to.
//!
//! A processor receives the saved input files and the output directory and
//! reports the artifact it produced plus its own log lines. This crate only
//! fixes that contract; [`CommandDelegate`] adapts an external program to it.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Errors reported by a processor.
#[derive(Debug, Error)]
pub enum DelegateError {
    /// The processor rejected its input or failed internally.
    #[error("{0}")]
    Failed(String),

    #[error("Failed to start processor '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Processor exited with code {code}: {detail}")]
    Exited { code: i32, detail: String },

    #[error("Processor finished without reporting an artifact")]
    NoArtifact,

    #[error("Processor I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Saved input files of a run, keyed by role field, in role order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleInputs {
    entries: Vec<(String, PathBuf)>,
}

impl RoleInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.push((field.into(), path.into()));
    }

    /// Path saved for `field`.
    pub fn get(&self, field: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, p)| p.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(f, p)| (f.as_str(), p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a successful processor run hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateOutput {
    /// The generated file, normally inside the output directory.
    pub artifact: PathBuf,

    /// Log lines in the order they were produced.
    pub logs: Vec<String>,
}

/// Transformation routine behind a processing module.
#[async_trait]
pub trait ProcessingDelegate: Send + Sync {
    async fn process(
        &self,
        inputs: &RoleInputs,
        output_dir: &Path,
    ) -> Result<DelegateOutput, DelegateError>;
}

/// Stdout prefix a [`CommandDelegate`] program uses to name its artifact.
pub const ARTIFACT_PREFIX: &str = "ARTIFACT:";

/// Runs an external program as the processor.
///
/// The program is called as
/// `<program> <args..> --output-dir <dir> --input <FIELD>=<path>...`.
/// Each non-empty stdout line becomes a log line, except `ARTIFACT: <path>`
/// which names the artifact (relative paths are taken from the output
/// directory). A non-zero exit status is a failure.
#[derive(Debug, Clone)]
pub struct CommandDelegate {
    program: String,
    args: Vec<String>,
}

impl CommandDelegate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Builder method to add an argument placed before the generated ones.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self, inputs: &RoleInputs, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.arg("--output-dir").arg(output_dir);
        for (field, path) in inputs.iter() {
            let mut pair = std::ffi::OsString::from(format!("{}=", field));
            pair.push(path);
            cmd.arg("--input").arg(pair);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ProcessingDelegate for CommandDelegate {
    async fn process(
        &self,
        inputs: &RoleInputs,
        output_dir: &Path,
    ) -> Result<DelegateOutput, DelegateError> {
        info!(
            program = %self.program,
            inputs = inputs.len(),
            output_dir = %output_dir.display(),
            "Starting processor"
        );

        let mut child = self
            .command(inputs, output_dir)
            .spawn()
            .map_err(|source| DelegateError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DelegateError::Failed("Processor stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DelegateError::Failed("Processor stderr unavailable".to_string()))?;

        // Drain stderr concurrently so a chatty processor can't block on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut last = None;
            while let Ok(Some(line)) = read_line_lossy(&mut reader, &mut buf).await {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    warn!(stderr = %trimmed, "Processor stderr");
                    last = Some(trimmed.to_string());
                }
            }
            last
        });

        let mut logs = Vec::new();
        let mut artifact = None;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = read_line_lossy(&mut reader, &mut buf).await? {
            let trimmed = line.trim_end();
            if trimmed.trim().is_empty() {
                continue;
            }
            match trimmed.strip_prefix(ARTIFACT_PREFIX) {
                Some(path) => artifact = Some(PathBuf::from(path.trim())),
                None => logs.push(trimmed.to_string()),
            }
        }

        let status = child.wait().await?;
        let last_stderr = stderr_task.await.unwrap_or_default();
        debug!(status = %status, log_lines = logs.len(), "Processor exited");

        if !status.success() {
            return Err(DelegateError::Exited {
                code: status.code().unwrap_or(-1),
                detail: last_stderr.unwrap_or_else(|| "no error output".to_string()),
            });
        }

        let artifact = artifact.ok_or(DelegateError::NoArtifact)?;
        let artifact = if artifact.is_relative() {
            output_dir.join(artifact)
        } else {
            artifact
        };

        Ok(DelegateOutput { artifact, logs })
    }
}

/// Next line of `reader`, with invalid UTF-8 replaced. `None` at end of stream.
async fn read_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(buf.as_slice()).into_owned()))
}
