use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::storage::filename;

pub const NO_TEXT_WARNING: &str = "No text could be extracted";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractResponse {
    pub text: String,
    /// Stored (timestamp-prefixed) name, usable with `/download/{filename}`.
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ExtractResponse {
    pub fn new(text: String, filename: String) -> Self {
        let warning = text.is_empty().then(|| NO_TEXT_WARNING.to_string());
        Self {
            text,
            filename,
            warning,
        }
    }
}

struct FilePart {
    name: String,
    bytes: axum::body::Bytes,
}

/// `POST /extract_text`
///
/// Accepts a multipart form with a `file` part, stores it under a
/// timestamped name and returns the recognized text.
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>> {
    state.janitor.run_once().await;

    let max_mib = state.config.server.max_content_length_mib();
    let mut multipart = multipart.map_err(|_| AppError::MissingFile)?;
    let part = read_file_part(&mut multipart, max_mib).await?;

    if part.name.is_empty() {
        return Err(AppError::EmptyFilename);
    }
    if !filename::is_allowed(&part.name) {
        return Err(AppError::FileTypeNotAllowed(part.name));
    }

    let upload = state.store.save(&part.name, &part.bytes).await?;
    drop(part);

    let extraction = state.pipeline.extract(&upload).await?;
    info!(
        filename = %upload.stored_name,
        chars = extraction.text.len(),
        "Text extracted"
    );

    Ok(Json(ExtractResponse::new(extraction.text, upload.stored_name)))
}

/// Find the `file` part. Parts without a filename are form fields, not files.
async fn read_file_part(multipart: &mut Multipart, max_mib: usize) -> Result<FilePart> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(AppError::MissingFile),
            Err(e) => return Err(multipart_error(e, max_mib)),
        };

        if field.name() != Some("file") {
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if name.is_empty() {
            return Err(AppError::EmptyFilename);
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_mib))?;
        return Ok(FilePart { name, bytes });
    }
}

fn multipart_error(error: MultipartError, max_mib: usize) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { max_mib }
    } else {
        tracing::debug!("Malformed multipart body: {}", error.body_text());
        AppError::MissingFile
    }
}
