use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use image::{GrayImage, ImageFormat, Luma};
use tempfile::TempDir;

use textlift::api::{create_router, AppState};
use textlift::config::{Config, OcrConfig, ServerConfig, StorageConfig};
use textlift::error::{AppError, Result};
use textlift::ocr::TextReader;

pub const BOUNDARY: &str = "textlift-test-boundary";

/// Canned OCR engine: returns fixed fragments (or fails) and counts calls.
pub struct FakeReader {
    fragments: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeReader {
    pub fn returning(fragments: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fragments: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextReader for FakeReader {
    async fn read_text(&self, _path: &Path) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Ocr("simulated engine crash".to_string()));
        }
        Ok(self.fragments.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub fn new(reader: Arc<FakeReader>) -> Self {
        Self::with_limit(reader, 16 * 1024 * 1024)
    }

    pub fn with_limit(reader: Arc<FakeReader>, max_content_length: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let upload_dir = dir.path().join("static").join("uploads");
        std::fs::create_dir_all(&upload_dir).unwrap();

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                max_content_length,
            },
            storage: StorageConfig {
                upload_dir: upload_dir.clone(),
                max_age_secs: 86_400,
                janitor_interval_secs: 0,
            },
            ocr: OcrConfig {
                model_dir: dir.path().join("model"),
                download_enabled: false,
                ..OcrConfig::default()
            },
        };

        let router = create_router(AppState::new(config, reader));
        Self {
            router,
            upload_dir,
            _dir: dir,
        }
    }

    /// Names currently stored in the upload directory, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// One part of a multipart body.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub bytes: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(filename: &str, bytes: &[u8]) -> Request<Body> {
    multipart_request(&[Part {
        name: "file",
        filename: Some(filename),
        bytes,
    }])
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/extract_text")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_pixel(width, height, Luma([230]));
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// Assemble a PDF from object bodies (object 1 is the catalog) with a
/// correct cross-reference table.
pub fn pdf_from_objects(objects: &[String]) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = out.len();
    let size = objects.len() + 1;
    out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
    );
    out
}

fn pdf_stream(data: &str) -> String {
    format!("<< /Length {} >>\nstream\n{}\nendstream", data.len(), data)
}

fn single_page_pdf(page_extra: &str, resources: &str, content: &str) -> Vec<u8> {
    pdf_from_objects(&[
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R{page_extra} /Resources {resources} /Contents 5 0 R >>"
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        pdf_stream(content),
    ])
}

const LETTER: &str = " /MediaBox [0 0 612 792]";
const HELVETICA: &str = "<< /Font << /F1 4 0 R >> >>";

/// One Letter page showing `text` in Helvetica.
pub fn pdf_with_text(text: &str) -> Vec<u8> {
    single_page_pdf(
        LETTER,
        HELVETICA,
        &format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET"),
    )
}

/// A page that only paints a filled rectangle, like a scan without a text layer.
pub fn pdf_without_text_layer() -> Vec<u8> {
    single_page_pdf(LETTER, "<< >>", "0 0 0 rg 72 72 200 100 re f")
}

/// Structurally valid, but the page has no `/MediaBox` anywhere in its tree.
pub fn pdf_without_media_box() -> Vec<u8> {
    single_page_pdf("", HELVETICA, "BT /F1 24 Tf 72 700 Td (Boom) Tj ET")
}
