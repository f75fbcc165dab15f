use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt as _;
use reqwest::Client;

use crate::error::{AppError, Result};

const USER_AGENT: &str = "tomcat-launcher";

/// Fetch a text resource such as a directory listing.
pub async fn fetch_text(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let resp = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AppError::network_with_url(url, e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AppError::network_with_url(url, resp.status().to_string()));
    }

    resp.text()
        .await
        .map_err(|e| AppError::network_with_url(url, e.to_string()))
}

/// Stream `url` into `dest`. A failed transfer removes the partially written file.
pub async fn download_file(client: &Client, url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| AppError::io(e.to_string()))?;
    }

    let result = stream_to_file(client, url, dest).await;
    if result.is_err() && dest.exists() {
        if let Err(e) = fs::remove_file(dest) {
            log::warn!("Failed to remove partial download {:?}: {}", dest, e);
        }
    }
    result
}

async fn stream_to_file(client: &Client, url: &str, dest: &Path) -> Result<()> {
    let resp = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await
        .map_err(|e| AppError::network_with_url(url, e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AppError::network_with_url(url, resp.status().to_string()));
    }

    let mut file = fs::File::create(dest).map_err(|e| AppError::io(e.to_string()))?;
    let mut stream = resp.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::network_with_url(url, e.to_string()))?;
        file.write_all(&chunk)
            .map_err(|e| AppError::io(e.to_string()))?;
    }
    file.flush().map_err(|e| AppError::io(e.to_string()))?;

    Ok(())
}
