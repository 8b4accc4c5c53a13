//! Server configuration.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;

/// Where uploaded files are placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum UploadLayout {
    /// `<upload_dir>/<category>/<run_id>/`: runs never share files.
    #[default]
    RunScoped,
    /// `<upload_dir>/<category>/`: one latest copy per role, runs of a
    /// category are serialized.
    Shared,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server bind address.
    pub http_addr: String,

    /// Root of the uploads area.
    pub upload_dir: PathBuf,

    /// Directory processors write artifacts to.
    pub output_dir: PathBuf,

    /// Directory for per-run log files.
    pub log_dir: PathBuf,

    /// Directory served under `/static`.
    pub static_dir: PathBuf,

    pub upload_layout: UploadLayout,

    /// Upper bound for one processor invocation (seconds).
    pub delegate_timeout_secs: u64,

    /// Maximum accepted request body size (bytes).
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Configuration with the uploads, output and logs areas under `dir`.
    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            upload_dir: dir.join("uploads"),
            output_dir: dir.join("output"),
            log_dir: dir.join("logs"),
            ..Self::default()
        }
    }

    pub fn delegate_timeout(&self) -> Duration {
        Duration::from_secs(self.delegate_timeout_secs)
    }

    /// Create the uploads, output and logs directories.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [&self.upload_dir, &self.output_dir, &self.log_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            log_dir: PathBuf::from("logs"),
            static_dir: PathBuf::from("static"),
            upload_layout: UploadLayout::RunScoped,
            delegate_timeout_secs: 300,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_data_dir_places_areas_under_dir() {
        let config = ServerConfig::with_data_dir("/srv/sheetrun");
        assert_eq!(config.upload_dir, PathBuf::from("/srv/sheetrun/uploads"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/sheetrun/output"));
        assert_eq!(config.log_dir, PathBuf::from("/srv/sheetrun/logs"));
        assert_eq!(config.upload_layout, UploadLayout::RunScoped);
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig::with_data_dir(tmp.path());
        config.ensure_dirs().unwrap();
        config.ensure_dirs().unwrap();
        assert!(config.upload_dir.is_dir());
        assert!(config.output_dir.is_dir());
        assert!(config.log_dir.is_dir());
    }
}
