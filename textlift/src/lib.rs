//! Image-to-text HTTP service.
//!
//! Uploads are stored in a flat directory, binarized with an adaptive
//! Gaussian threshold and read by Tesseract. See [`api::create_router`] for
//! the HTTP surface.

pub mod api;
pub mod config;
pub mod error;
pub mod ocr;
pub mod processing;
pub mod storage;
