//! Flat upload directory: timestamped saves, safe lookups and time-based
//! cleanup.

pub mod filename;
mod janitor;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{AppError, Result};

pub use janitor::{Janitor, SweepReport};

/// A file persisted in the upload directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub original_name: String,
    pub sanitized_name: String,
    /// Name on disk, `{unix_ts}_{sanitized}` (with a counter when taken).
    pub stored_name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Persist `bytes` under a timestamp-prefixed, sanitized name.
    ///
    /// Names are claimed with an exclusive create, so a second upload with the
    /// same name in the same second gets `{ts}_{n}_{name}` instead of
    /// overwriting the first one.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
        let sanitized_name = filename::sanitize(original_name);
        if !filename::is_allowed(&sanitized_name) {
            return Err(AppError::FileTypeNotAllowed(original_name.to_string()));
        }

        self.ensure_dir()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to create upload directory: {e}")))?;

        let timestamp = Utc::now().timestamp();
        let mut attempt = 0u32;
        let (stored_name, path, mut file) = loop {
            let candidate = if attempt == 0 {
                format!("{timestamp}_{sanitized_name}")
            } else {
                format!("{timestamp}_{attempt}_{sanitized_name}")
            };
            let path = self.dir.join(&candidate);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (candidate, path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(AppError::Upload(format!(
                        "Failed to create {}: {e}",
                        path.display()
                    )))
                }
            }
        };

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::Upload(format!(
                "Failed to write {}: {e}",
                path.display()
            )));
        }

        info!("File saved: {}", stored_name);

        Ok(StoredUpload {
            original_name: original_name.to_string(),
            sanitized_name,
            stored_name,
            path,
            size: bytes.len() as u64,
        })
    }

    /// Resolve a download name to a regular file inside the upload directory.
    ///
    /// Anything that is not a single plain path component is treated as
    /// missing.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf> {
        let not_found = || AppError::NotFound(name.to_string());

        let is_plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !is_plain {
            return Err(not_found());
        }

        let path = self.dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(path),
            _ => Err(not_found()),
        }
    }

    pub fn janitor(&self, max_age: std::time::Duration, interval_secs: u64) -> Janitor {
        Janitor::new(self.dir.clone(), max_age, interval_secs)
    }
}
