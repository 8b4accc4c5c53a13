//! Lookup of generated artifacts in the output directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs::File;

/// Errors resolving an artifact name.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The name would resolve outside the output directory.
    #[error("Invalid artifact name: {0}")]
    PathTraversal(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Failed to open artifact '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// An opened artifact, ready to be streamed.
#[derive(Debug)]
pub struct Artifact {
    pub file: File,
    pub file_name: String,
    pub len: u64,
    pub content_type: String,
}

/// Read access to the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Open the artifact called `name`.
    ///
    /// `name` must be a single plain path component; anything else is
    /// rejected before the filesystem is consulted.
    pub async fn open(&self, name: &str) -> Result<Artifact, ArtifactError> {
        validate_name(name)?;
        let path = self.output_dir.join(name);

        let io_err = |source: io::Error| match source.kind() {
            io::ErrorKind::NotFound => ArtifactError::NotFound(name.to_string()),
            _ => ArtifactError::Io {
                name: name.to_string(),
                source,
            },
        };

        let metadata = tokio::fs::metadata(&path).await.map_err(io_err)?;
        if !metadata.is_file() {
            return Err(ArtifactError::NotFound(name.to_string()));
        }
        let file = File::open(&path).await.map_err(io_err)?;

        Ok(Artifact {
            file,
            file_name: name.to_string(),
            len: metadata.len(),
            content_type: content_type_for(name),
        })
    }
}

fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let rejected = || ArtifactError::PathTraversal(name.to_string());

    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(rejected());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(rejected()),
    }
}

/// Content type for a file name; spreadsheets get their registered types.
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_traversal_names_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path().join("output"));
        std::fs::write(tmp.path().join("secret.txt"), b"secret").unwrap();

        for name in ["", ".", "..", "../secret.txt", "a/b.xlsx", "..\\secret.txt", "/etc/passwd", "x\0y"] {
            let err = store.open(name).await.unwrap_err();
            assert!(matches!(err, ArtifactError::PathTraversal(_)), "{name:?}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        std::fs::create_dir(tmp.path().join("subdir")).unwrap();

        for name in ["never_produced.xlsx", "subdir"] {
            let err = store.open(name).await.unwrap_err();
            assert!(matches!(err, ArtifactError::NotFound(_)), "{name}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_open_returns_content_and_type() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("resultado.xlsx"), b"PK workbook").unwrap();
        let store = ArtifactStore::new(tmp.path());

        let mut artifact = store.open("resultado.xlsx").await.unwrap();
        let mut content = Vec::new();
        artifact.file.read_to_end(&mut content).await.unwrap();

        assert_eq!(content, b"PK workbook");
        assert_eq!(artifact.len, 11);
        assert_eq!(artifact.file_name, "resultado.xlsx");
        assert_eq!(
            artifact.content_type,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(content_type_for("report.csv"), "text/csv");
        assert_eq!(content_type_for("blob.unknownext"), "application/octet-stream");
    }
}
