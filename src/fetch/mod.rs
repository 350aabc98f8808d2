// src/fetch/mod.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::{path::Path, time::Duration};
use tokio::{fs, time::sleep};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::table::RawTable;

pub const MAX_RETRIES: u32 = 3;
pub const INITIAL_BACKOFF_MS: u64 = 500;

async fn get_bytes_core(client: &Client, url: &Url) -> Result<Vec<u8>> {
    debug!("Fetching {}", url);
    Ok(client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("Reading body from {}", url))?
        .to_vec())
}

/// GET `url`, retrying with exponential backoff.
pub async fn get_bytes_with_retry(
    client: &Client,
    url: &Url,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<Vec<u8>> {
    let mut attempts = 0;
    loop {
        match get_bytes_core(client, url).await {
            Ok(b) => return Ok(b),
            Err(e) if attempts < max_retries => {
                attempts += 1;
                let backoff = initial_backoff_ms * 2u64.pow(attempts - 1);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}

/// Fetch a published CSV export, refresh the local cache with it, and parse it.
///
/// Any fetch or parse failure falls back to the cache; without a cache the
/// result is an empty table.
#[instrument(level = "info", skip(client, cache_path), fields(cache = %cache_path.as_ref().display()))]
pub async fn fetch_form_csv<P: AsRef<Path>>(
    client: &Client,
    url: &str,
    cache_path: P,
) -> Result<RawTable> {
    let cache_path = cache_path.as_ref();
    match download_form_csv(client, url, cache_path).await {
        Ok(table) => {
            info!(rows = table.rows.len(), "fetched form export");
            Ok(table)
        }
        Err(e) => {
            warn!(error = %e, "fetching form export failed; falling back to cache");
            load_cached(cache_path)
        }
    }
}

async fn download_form_csv(client: &Client, url: &str, cache_path: &Path) -> Result<RawTable> {
    let url = Url::parse(url).with_context(|| format!("parsing CSV URL {}", url))?;
    let bytes = get_bytes_with_retry(client, &url, MAX_RETRIES, INITIAL_BACKOFF_MS).await?;
    // exports are UTF-8 regardless of what the response headers claim
    let text = String::from_utf8_lossy(&bytes);
    let table = RawTable::from_csv_str(&text).context("parsing fetched CSV")?;

    if let Some(parent) = cache_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(cache_path, text.as_bytes())
        .await
        .with_context(|| format!("writing cache {}", cache_path.display()))?;
    info!(path = %cache_path.display(), "saved CSV cache");

    Ok(table)
}

/// Local cache only; missing file → empty table.
pub fn load_cached<P: AsRef<Path>>(cache_path: P) -> Result<RawTable> {
    let cache_path = cache_path.as_ref();
    let table = RawTable::read_csv_file(cache_path)?;
    info!(path = %cache_path.display(), rows = table.rows.len(), "loaded CSV cache");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[tokio::test]
    async fn bad_url_falls_back_to_cache() -> Result<()> {
        let tmp = tempdir()?;
        let cache = tmp.path().join("comments.csv");
        std::fs::write(&cache, "タイムスタンプ,コメント\n2026/01/11 8:00:00,hello\n")?;

        let client = Client::new();
        let table = fetch_form_csv(&client, "not a url", &cache).await?;
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "hello");
        Ok(())
    }

    #[tokio::test]
    async fn bad_url_without_cache_is_empty() -> Result<()> {
        let tmp = tempdir()?;
        let client = Client::new();
        let table = fetch_form_csv(&client, "::::", tmp.path().join("missing.csv")).await?;
        assert!(table.rows.is_empty());
        assert!(table.headers.is_empty());
        Ok(())
    }
}
