//! Upload processing handler.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use sheetrun_core::ModuleSpec;

use crate::http::responses::{ErrorResponse, ProcessResponse};
use crate::ingest::Uploads;
use crate::state::AppState;

/// Multipart body does not carry the module's required files.
#[derive(Debug, Error)]
enum FormError {
    #[error("Missing required file field(s): {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("File field '{0}' was sent more than once")]
    Duplicate(String),

    #[error("Malformed multipart body: {0}")]
    Malformed(#[from] MultipartError),
}

/// Run a module over the uploaded files.
///
/// POST /:module/process
///
/// Run outcomes, failed ones included, are answered with 200 and a
/// `ProcessResponse`; only transport problems get an error status.
pub async fn process_module(
    State(state): State<Arc<AppState>>,
    Path(module): Path<String>,
    multipart: Multipart,
) -> Response {
    let Some(entry) = state.modules.get(&module) else {
        return error_response(StatusCode::NOT_FOUND, format!("Unknown module: {}", module));
    };
    let Some(delegate) = entry.delegate.clone() else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Module '{}' has no processing pipeline", module),
        );
    };

    let uploads = match read_uploads(&entry.spec, multipart).await {
        Ok(uploads) => uploads,
        Err(e) => {
            warn!(category = %module, error = %e, "Rejected upload");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
        }
    };

    info!(category = %module, files = uploads.len(), "Processing request accepted");

    let run = state.metrics.start_run(&entry.spec.name);
    let result = state
        .orchestrator
        .process_run(&entry.spec, delegate.as_ref(), uploads)
        .await;
    run.finish(result.is_success());

    (StatusCode::OK, Json(ProcessResponse::from(result))).into_response()
}

/// Collect every role's payload from the body before anything touches disk.
async fn read_uploads(spec: &ModuleSpec, mut multipart: Multipart) -> Result<Uploads, FormError> {
    let mut uploads = Uploads::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if spec.role(&name).is_none() {
            debug!(field = %name, "Ignoring unknown form field");
            continue;
        }
        if uploads.contains(&name) {
            return Err(FormError::Duplicate(name));
        }

        let bytes = field.bytes().await?;
        debug!(field = %name, bytes = bytes.len(), "Received upload");
        uploads.insert(name, Box::new(Cursor::new(bytes)));
    }

    let present: HashSet<&str> = spec.fields().filter(|f| uploads.contains(f)).collect();
    let missing = spec.missing_fields(&present);
    if !missing.is_empty() {
        return Err(FormError::Missing(
            missing.into_iter().map(str::to_string).collect(),
        ));
    }

    Ok(uploads)
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse::new(error))).into_response()
}
