use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, error, info};

/// Outcome of one pass over the upload directory.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub kept: usize,
    pub failures: Vec<(PathBuf, std::io::Error)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Removes uploads (and leftover processed artifacts) once they are older
/// than `max_age`.
#[derive(Debug, Clone)]
pub struct Janitor {
    dir: PathBuf,
    max_age: Duration,
    interval_secs: u64,
}

impl Janitor {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration, interval_secs: u64) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            interval_secs,
        }
    }

    pub async fn run_once(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Sweep the directory as if the current time were `now`.
    ///
    /// Only regular files strictly older than `max_age` are deleted. Every
    /// per-file failure is recorded and the sweep carries on.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Upload directory missing, nothing to clean");
                return report;
            }
            Err(e) => {
                error!(dir = %self.dir.display(), "Failed to list upload directory: {}", e);
                report.failures.push((self.dir.clone(), e));
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read upload directory entry: {}", e);
                    report.failures.push((self.dir.clone(), e));
                    break;
                }
            };

            let path = entry.path();
            match self.sweep_entry(&path, now).await {
                Ok(true) => {
                    info!("Deleted old file: {}", file_label(&path));
                    report.removed.push(path);
                }
                Ok(false) => report.kept += 1,
                Err(e) => {
                    error!("Error deleting file {}: {}", file_label(&path), e);
                    report.failures.push((path, e));
                }
            }
        }

        if !report.removed.is_empty() || !report.is_clean() {
            info!(
                "Upload cleanup complete: {} removed, {} kept, {} errors",
                report.removed.len(),
                report.kept,
                report.failures.len()
            );
        }

        report
    }

    async fn sweep_entry(&self, path: &Path, now: SystemTime) -> std::io::Result<bool> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Ok(false);
        }

        let modified = metadata.modified()?;
        let expired = match now.duration_since(modified) {
            Ok(age) => age > self.max_age,
            // mtime in the future
            Err(_) => false,
        };

        if expired {
            tokio::fs::remove_file(path).await?;
        }
        Ok(expired)
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
