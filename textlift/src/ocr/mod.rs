//! OCR (Optical Character Recognition) Module
//!
//! Turns a stored upload into text fragments:
//! - `preprocessing` binarizes raster images (grayscale + adaptive Gaussian
//!   threshold) into a `{path}_processed.jpg` artifact
//! - `provider` holds the lazily initialized Tesseract engine behind the
//!   `TextReader` trait
//! - `model` fetches missing Tesseract language data into the model directory
//! - `pdf` reads the embedded text layer of PDFs, which never reach the
//!   raster pipeline
//!
//! # Usage
//!
//! ```rust,ignore
//! let reader = TesseractReader::new(&config.ocr);
//! let input = preprocess(&path).await.unwrap_or(path.clone());
//! let fragments = reader.read_text(&input).await?;
//! ```

mod model;
pub mod pdf;
pub mod preprocessing;
mod provider;

pub use preprocessing::{preprocess, processed_path};
pub use provider::{pin_engine_threads, TesseractReader, TextReader, OMP_THREAD_LIMIT};

/// Split engine output into trimmed, non-empty lines.
pub fn split_fragments(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
