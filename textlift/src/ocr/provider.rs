use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leptess::LepTess;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{AppError, Result};

use super::{model, split_fragments};

/// Anything that turns an image file into ordered text fragments.
#[async_trait]
pub trait TextReader: Send + Sync {
    /// One entry per detected text line, in the engine's reading order.
    async fn read_text(&self, path: &Path) -> Result<Vec<String>>;
}

/// Tesseract engine shared by every request.
///
/// Nothing is loaded until the first `read_text` call; concurrent first calls
/// wait for the same initialization. A failed initialization is retried on
/// the next call. Inference runs one image at a time.
pub struct TesseractReader {
    engine: OnceCell<Arc<Mutex<LepTess>>>,
    config: OcrConfig,
}

/// Read once by Tesseract's OpenMP runtime when the engine is built.
pub const OMP_THREAD_LIMIT: &str = "OMP_THREAD_LIMIT";

/// Limit Tesseract to one OpenMP thread unless the operator already chose a
/// value. Call before any engine exists. Returns whether the limit was set.
pub fn pin_engine_threads() -> bool {
    if std::env::var_os(OMP_THREAD_LIMIT).is_some() {
        return false;
    }
    std::env::set_var(OMP_THREAD_LIMIT, "1");
    true
}

fn create_tesseract(model_dir: &Path, languages: &str) -> Result<LepTess> {
    let data_path = model_dir.to_str().ok_or_else(|| {
        AppError::Ocr(format!(
            "Model directory is not valid UTF-8: {}",
            model_dir.display()
        ))
    })?;
    LepTess::new(Some(data_path), languages)
        .map_err(|e| AppError::Ocr(format!("Tesseract not available: {e}")))
}

impl TesseractReader {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            engine: OnceCell::new(),
            config: config.clone(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }

    async fn engine(&self) -> Result<Arc<Mutex<LepTess>>> {
        let config = &self.config;
        self.engine
            .get_or_try_init(|| async move {
                let model_dir = model::ensure_models(config).await?;
                let languages = config.languages.clone();

                let lt = tokio::task::spawn_blocking(move || {
                    create_tesseract(&model_dir, &languages)
                })
                .await
                .map_err(|e| AppError::Ocr(format!("OCR init task panicked: {e}")))??;

                info!(languages = %config.languages, "Tesseract OCR initialized");
                Ok::<_, AppError>(Arc::new(Mutex::new(lt)))
            })
            .await
            .map(Arc::clone)
    }

    async fn read_text_internal(&self, path: &Path) -> Result<Vec<String>> {
        let engine = self.engine().await?;
        let bytes = tokio::fs::read(path).await?;

        let text = tokio::task::spawn_blocking(move || {
            let mut lt = engine.blocking_lock();
            lt.set_image_from_mem(&bytes)
                .map_err(|e| AppError::Ocr(format!("Failed to set image: {e}")))?;
            lt.get_utf8_text()
                .map_err(|e| AppError::Ocr(format!("Failed to extract text: {e}")))
        })
        .await
        .map_err(|e| AppError::Ocr(format!("OCR task panicked: {e}")))??;

        let fragments = split_fragments(&text);
        debug!(fragments = fragments.len(), "OCR finished for {}", path.display());
        Ok(fragments)
    }
}

#[async_trait]
impl TextReader for TesseractReader {
    async fn read_text(&self, path: &Path) -> Result<Vec<String>> {
        if self.config.timeout_secs == 0 {
            return self.read_text_internal(path).await;
        }

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout_duration, self.read_text_internal(path)).await {
            Ok(inner_result) => inner_result,
            Err(_) => Err(AppError::Ocr(format!(
                "OCR operation timed out after {} seconds",
                self.config.timeout_secs
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use serial_test::serial;
    use tempfile::TempDir;

    fn offline_config(model_dir: &Path) -> OcrConfig {
        OcrConfig {
            languages: "eng".to_string(),
            model_dir: model_dir.to_path_buf(),
            model_url: "http://127.0.0.1:9/{lang}.traineddata".to_string(),
            download_enabled: false,
            timeout_secs: 60,
        }
    }

    #[test]
    #[serial]
    fn test_pin_engine_threads_sets_single_thread() {
        std::env::remove_var(OMP_THREAD_LIMIT);

        assert!(pin_engine_threads());
        assert_eq!(std::env::var(OMP_THREAD_LIMIT).unwrap(), "1");

        std::env::remove_var(OMP_THREAD_LIMIT);
    }

    #[test]
    #[serial]
    fn test_pin_engine_threads_keeps_operator_value() {
        std::env::set_var(OMP_THREAD_LIMIT, "4");

        assert!(!pin_engine_threads());
        assert_eq!(std::env::var(OMP_THREAD_LIMIT).unwrap(), "4");

        std::env::remove_var(OMP_THREAD_LIMIT);
    }

    #[test]
    fn test_reader_is_lazy() {
        let dir = TempDir::new().unwrap();
        let reader = TesseractReader::new(&offline_config(dir.path()));
        assert!(!reader.is_initialized());
    }

    #[tokio::test]
    async fn test_missing_model_fails_and_is_retried() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("blank.png");
        GrayImage::from_pixel(10, 10, Luma([255])).save(&image).unwrap();

        let reader = TesseractReader::new(&offline_config(&dir.path().join("model")));

        let first = reader.read_text(&image).await;
        assert!(matches!(first, Err(AppError::ModelDownload(_))));
        assert!(!reader.is_initialized());

        let second = reader.read_text(&image).await;
        assert!(second.is_err());
    }

    /// 5x7 bitmap glyphs, `#` is ink.
    fn glyph(c: char) -> [&'static str; 7] {
        match c {
            'H' => ["#...#", "#...#", "#...#", "#####", "#...#", "#...#", "#...#"],
            'E' => ["#####", "#....", "#....", "####.", "#....", "#....", "#####"],
            'L' => ["#....", "#....", "#....", "#....", "#....", "#....", "#####"],
            'O' => [".###.", "#...#", "#...#", "#...#", "#...#", "#...#", ".###."],
            _ => panic!("no glyph for {c}"),
        }
    }

    fn render(word: &str, scale: u32) -> GrayImage {
        let margin = 3 * scale;
        let cell = 6 * scale;
        let width = margin * 2 + cell * word.len() as u32;
        let height = margin * 2 + 7 * scale;
        let mut img = GrayImage::from_pixel(width, height, Luma([255]));

        for (i, c) in word.chars().enumerate() {
            for (row, line) in glyph(c).iter().enumerate() {
                for (col, ink) in line.chars().enumerate() {
                    if ink != '#' {
                        continue;
                    }
                    let x0 = margin + i as u32 * cell + col as u32 * scale;
                    let y0 = margin + row as u32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            img.put_pixel(x0 + dx, y0 + dy, Luma([0]));
                        }
                    }
                }
            }
        }
        img
    }

    #[tokio::test]
    #[ignore = "requires Tesseract and downloads eng.traineddata"]
    async fn test_reads_rendered_word() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("hello.png");
        render("HELLO", 12).save(&image).unwrap();

        let reader = TesseractReader::new(&OcrConfig::default());
        let fragments = reader.read_text(&image).await.unwrap();

        let joined = fragments.join(" ").to_uppercase().replace(' ', "");
        assert!(joined.contains("HELLO"), "got {fragments:?}");
        assert!(reader.is_initialized());
    }
}
