use std::env;
use std::path::PathBuf;

/// Extensions accepted by `/extract_text`, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "pdf"];

/// `{lang}` is replaced with each Tesseract language code.
pub const DEFAULT_MODEL_URL: &str =
    "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{lang}.traineddata";

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole request body, in bytes.
    pub max_content_length: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Files older than this are removed by the janitor.
    pub max_age_secs: u64,
    /// Period of the background janitor; `0` leaves cleanup to requests only.
    pub janitor_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub languages: String,
    pub model_dir: PathBuf,
    pub model_url: String,
    pub download_enabled: bool,
    pub timeout_secs: u64,
}

impl ServerConfig {
    /// The limit rendered the way clients see it in the 413 message.
    pub fn max_content_length_mib(&self) -> usize {
        self.max_content_length / (1024 * 1024)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("static/uploads"),
            max_age_secs: 86_400,
            janitor_interval_secs: 3600,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            model_dir: PathBuf::from("./model"),
            model_url: DEFAULT_MODEL_URL.to_string(),
            download_enabled: true,
            timeout_secs: 120,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let storage_defaults = StorageConfig::default();
        let ocr_defaults = OcrConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("TEXTLIFT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("TEXTLIFT_PORT", 5000),
                max_content_length: parse_env_or("MAX_CONTENT_LENGTH", 16 * 1024 * 1024),
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_FOLDER")
                    .map(PathBuf::from)
                    .unwrap_or(storage_defaults.upload_dir),
                max_age_secs: parse_env_or("UPLOAD_MAX_AGE_SECS", storage_defaults.max_age_secs),
                janitor_interval_secs: parse_env_or(
                    "JANITOR_INTERVAL_SECS",
                    storage_defaults.janitor_interval_secs,
                ),
            },
            ocr: OcrConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or(ocr_defaults.languages),
                model_dir: env::var("OCR_MODEL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(ocr_defaults.model_dir),
                model_url: env::var("OCR_MODEL_URL").unwrap_or(ocr_defaults.model_url),
                download_enabled: parse_env_or(
                    "OCR_DOWNLOAD_ENABLED",
                    ocr_defaults.download_enabled,
                ),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr_defaults.timeout_secs),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
