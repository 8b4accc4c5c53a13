//! Persisting uploaded files under their canonical names.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};

use sheetrun_core::UploadRole;

use crate::logger::{LogWriteError, RunLogger};

/// Payload of one uploaded file.
pub type UploadSource = Box<dyn AsyncRead + Send + Unpin>;

/// Errors while persisting an upload.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No payload was supplied for a required role.
    #[error("Missing upload for '{0}'")]
    Missing(String),

    #[error("Failed to create upload directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the payload or writing the destination failed.
    #[error("Failed to save '{role}' to '{}': {source}", path.display())]
    Write {
        role: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Log(#[from] LogWriteError),
}

/// Uploaded payloads keyed by multipart field name.
#[derive(Default)]
pub struct Uploads {
    sources: HashMap<String, UploadSource>,
}

impl Uploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a payload, returning the one it replaced.
    pub fn insert(&mut self, field: impl Into<String>, source: UploadSource) -> Option<UploadSource> {
        self.sources.insert(field.into(), source)
    }

    /// Builder variant of [`Uploads::insert`] for in-memory payloads.
    pub fn with_bytes(mut self, field: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(field, Box::new(io::Cursor::new(bytes.into())));
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.sources.contains_key(field)
    }

    pub fn take(&mut self, field: &str) -> Option<UploadSource> {
        self.sources.remove(field)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for Uploads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uploads")
            .field("fields", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Writes uploads of one run into a destination directory.
pub struct FileIngestion<'a> {
    dir: PathBuf,
    logger: &'a RunLogger,
}

impl<'a> FileIngestion<'a> {
    pub fn new(dir: impl Into<PathBuf>, logger: &'a RunLogger) -> Self {
        Self {
            dir: dir.into(),
            logger,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stream `source` into the canonical file of `role`, replacing any
    /// previous content.
    ///
    /// A failure midway can leave a truncated file behind.
    pub async fn save<R>(&self, role: &UploadRole, source: &mut R) -> Result<PathBuf, IngestError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| IngestError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let dest = self.dir.join(&role.file_name);
        self.logger
            .info(format!("Saving {} to {}...", role.file_name, dest.display()))
            .await?;

        copy_into(source, &dest)
            .await
            .map_err(|source| IngestError::Write {
                role: role.field.clone(),
                path: dest.clone(),
                source,
            })?;

        Ok(dest)
    }
}

async fn copy_into<R>(source: &mut R, dest: &Path) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = tokio::fs::File::create(dest).await?;
    let written = tokio::io::copy(source, &mut file).await?;
    file.flush().await?;
    Ok(written)
}
