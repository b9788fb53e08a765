use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::ocr::{pdf, preprocess, TextReader};
use crate::storage::StoredUpload;

/// Text pulled out of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Fragments joined with newlines, surrounding whitespace trimmed.
    pub text: String,
    pub fragments: usize,
    /// Whether OCR ran on the thresholded artifact rather than the original.
    pub preprocessed: bool,
}

/// Preprocess -> OCR -> artifact cleanup for a stored upload.
#[derive(Clone)]
pub struct ExtractionPipeline {
    reader: Arc<dyn TextReader>,
}

impl ExtractionPipeline {
    pub fn new(reader: Arc<dyn TextReader>) -> Self {
        Self { reader }
    }

    pub async fn extract(&self, upload: &StoredUpload) -> Result<Extraction> {
        if upload.size == 0 {
            return Err(AppError::Preprocessing(format!(
                "Uploaded file {} is empty",
                upload.stored_name
            )));
        }

        let (fragments, preprocessed) = if pdf::is_pdf(&upload.path) {
            (pdf::read_text_layer(&upload.path).await?, false)
        } else {
            self.read_image(&upload.path).await?
        };

        let text = fragments.join("\n").trim().to_string();
        debug!(
            filename = %upload.stored_name,
            fragments = fragments.len(),
            preprocessed,
            "Extraction complete"
        );

        Ok(Extraction {
            text,
            fragments: fragments.len(),
            preprocessed,
        })
    }

    async fn read_image(&self, path: &Path) -> Result<(Vec<String>, bool)> {
        let processed = preprocess(path).await;
        let input = processed.as_deref().unwrap_or(path);

        let result = self.reader.read_text(input).await;

        if let Some(artifact) = &processed {
            remove_artifact(artifact).await;
        }

        Ok((result?, processed.is_some()))
    }
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove processed image {}: {}", path.display(), e),
    }
}
