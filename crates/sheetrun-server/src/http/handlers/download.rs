//! Artifact download handler.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use crate::artifacts::ArtifactError;
use crate::http::responses::ErrorResponse;
use crate::state::AppState;

/// Stream a generated artifact.
///
/// GET /download/:filename
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    match state.artifacts.open(&filename).await {
        Ok(artifact) => {
            info!(artifact = %artifact.file_name, bytes = artifact.len, "Serving artifact");
            let disposition = format!(
                "attachment; filename=\"{}\"",
                header_safe(&artifact.file_name)
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, artifact.content_type),
                    (header::CONTENT_LENGTH, artifact.len.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Body::from_stream(ReaderStream::new(artifact.file)),
            )
                .into_response()
        }
        Err(ArtifactError::NotFound(name)) => {
            info!(artifact = %name, "Artifact not found");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("File not found.")),
            )
                .into_response()
        }
        Err(e @ ArtifactError::PathTraversal(_)) => {
            warn!(error = %e, "Rejected artifact name");
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to open artifact");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to read file.")),
            )
                .into_response()
        }
    }
}

/// File name with quotes and non-ASCII characters replaced, usable inside a
/// quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
