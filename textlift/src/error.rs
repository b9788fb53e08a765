use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file part")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("File type not allowed")]
    FileTypeNotAllowed(String),

    #[error("File not found")]
    NotFound(String),

    #[error("File too large (max {max_mib}MB)")]
    PayloadTooLarge { max_mib: usize },

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Model download error: {0}")]
    ModelDownload(String),

    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile | AppError::EmptyFilename | AppError::FileTypeNotAllowed(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client. Server-side failures never expose
    /// their detail.
    pub fn client_message(&self) -> String {
        match self {
            AppError::MissingFile
            | AppError::EmptyFilename
            | AppError::FileTypeNotAllowed(_)
            | AppError::NotFound(_)
            | AppError::PayloadTooLarge { .. } => self.to_string(),
            AppError::Upload(_) => "File upload failed".to_string(),
            _ => "Error processing image".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::FileTypeNotAllowed(name) => {
                tracing::info!(filename = %name, "Rejected upload with disallowed extension");
            }
            AppError::NotFound(name) => {
                tracing::debug!(filename = %name, "Requested file not found");
            }
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "Request failed");
            }
            _ => {}
        }

        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
