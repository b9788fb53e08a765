use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::OcrConfig;
use crate::error::{AppError, Result};

/// Tesseract language codes from a `+`-joined list such as `eng+deu`.
pub fn language_codes(languages: &str) -> Vec<&str> {
    languages
        .split('+')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect()
}

pub fn traineddata_path(model_dir: &Path, lang: &str) -> PathBuf {
    model_dir.join(format!("{lang}.traineddata"))
}

/// Make sure every configured language file exists in the model directory,
/// downloading missing ones when allowed. Returns the model directory.
pub async fn ensure_models(config: &OcrConfig) -> Result<PathBuf> {
    let codes = language_codes(&config.languages);
    if codes.is_empty() {
        return Err(AppError::Ocr("No OCR languages configured".to_string()));
    }

    let mut client: Option<reqwest::Client> = None;

    for lang in codes {
        let target = traineddata_path(&config.model_dir, lang);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            continue;
        }

        if !config.download_enabled {
            return Err(AppError::ModelDownload(format!(
                "Language data {} is missing and downloads are disabled",
                target.display()
            )));
        }

        let client = client.get_or_insert_with(reqwest::Client::new);
        let url = config.model_url.replace("{lang}", lang);
        download(client, &url, &target).await?;
    }

    Ok(config.model_dir.clone())
}

/// Stream `url` into `target`, going through a `.part` file so an interrupted
/// download never leaves a truncated model behind.
async fn download(client: &reqwest::Client, url: &str, target: &Path) -> Result<()> {
    info!("Downloading OCR model from {} to {}", url, target.display());

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::ModelDownload(format!(
            "GET {url} returned {status}"
        )));
    }

    let partial = target.with_extension("traineddata.part");
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    let copied: Result<()> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = copied {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    tokio::fs::rename(&partial, target).await?;
    info!(bytes = written, "OCR model ready at {}", target.display());
    Ok(())
}
