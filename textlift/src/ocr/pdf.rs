use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::error::{AppError, Result};

use super::split_fragments;

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Read the embedded text layer of a PDF, one fragment per non-empty line.
///
/// Scanned PDFs without a text layer yield no fragments.
pub async fn read_text_layer(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;

    let text = tokio::task::spawn_blocking(move || extract_text(&bytes))
        .await
        .map_err(|e| AppError::Pdf(format!("PDF task panicked: {e}")))??;

    Ok(split_fragments(&text))
}

/// pdf-extract panics on some malformed documents (missing `/MediaBox`,
/// fonts absent from the page resources). Those become `AppError::Pdf`.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(AppError::Pdf(format!("PDF extraction failed: {e}"))),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(AppError::Pdf(format!("PDF parser crashed: {reason}")))
        }
    }
}
