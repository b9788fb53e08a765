use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageBuffer, ImageReader, Luma, RgbImage};
use imageproc::definitions::Image;
use imageproc::filter::separable_filter_equal;
use tracing::{debug, error};

use crate::error::{AppError, Result};

/// Neighbourhood size of the adaptive threshold, in pixels.
pub const BLOCK_SIZE: usize = 11;
/// Subtracted from the local weighted mean before comparing.
pub const THRESHOLD_OFFSET: i16 = 2;
pub const JPEG_QUALITY: u8 = 95;

/// Path of the derived artifact for an upload: `{path}_processed.jpg`.
pub fn processed_path(path: &Path) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push("_processed.jpg");
    PathBuf::from(raw)
}

/// Binarize the image at `path` for OCR, falling back to `None` on any failure.
///
/// `None` means "use the original file"; the error is only logged.
pub async fn preprocess(path: &Path) -> Option<PathBuf> {
    let owned = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || preprocess_file(&owned))
        .await
        .map_err(|e| AppError::Preprocessing(format!("Preprocessing task panicked: {e}")))
        .and_then(|inner| inner);

    match result {
        Ok(processed) => Some(processed),
        Err(e) => {
            error!("Error preprocessing image {}: {}", path.display(), e);
            None
        }
    }
}

/// Decode, grayscale, threshold and write `{path}_processed.jpg`.
pub fn preprocess_file(path: &Path) -> Result<PathBuf> {
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| AppError::Preprocessing(format!("Could not read image file: {e}")))?;

    let gray = to_gray_bt601(&img.to_rgb8());
    let processed = adaptive_threshold_gaussian(&gray, BLOCK_SIZE, THRESHOLD_OFFSET);

    let output = processed_path(path);
    if let Err(e) = write_jpeg(&processed, &output) {
        let _ = std::fs::remove_file(&output);
        return Err(e);
    }

    debug!(
        width = processed.width(),
        height = processed.height(),
        "Wrote processed image {}",
        output.display()
    );
    Ok(output)
}

fn write_jpeg(img: &GrayImage, output: &Path) -> Result<()> {
    let mut writer = BufWriter::new(std::fs::File::create(output)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(img)?;
    writer.flush()?;
    Ok(())
}

/// Luma with the BT.601 weights: `0.299 R + 0.587 G + 0.114 B`.
pub fn to_gray_bt601(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalized 1-D Gaussian kernel with the sigma conventionally derived from
/// the kernel size: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Gaussian-weighted local mean, with edge pixels replicated past the border.
fn gaussian_mean(gray: &GrayImage, block_size: usize) -> GrayImage {
    let kernel = gaussian_kernel(block_size);
    let wide: Image<Luma<f32>> = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32])
    });
    let blurred = separable_filter_equal(&wide, &kernel);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Binary adaptive threshold: a pixel becomes white when it is brighter than
/// its Gaussian-weighted neighbourhood mean minus `offset`, black otherwise.
pub fn adaptive_threshold_gaussian(gray: &GrayImage, block_size: usize, offset: i16) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }

    let mean = gaussian_mean(gray, block_size);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let src = gray.get_pixel(x, y)[0] as i16;
        let local = mean.get_pixel(x, y)[0] as i16;
        if src > local - offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
