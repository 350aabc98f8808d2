// src/photos/mod.rs
//! Resolve submitted photo URLs into files in the local image cache.

pub mod resize;

use anyhow::{anyhow, Context, Result};
use futures::{stream, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::fetch::{get_bytes_with_retry, INITIAL_BACKOFF_MS};
use crate::normalize::CanonicalTable;
use crate::table::is_blank;

/// Extension of downloaded originals in the raw cache.
pub const RAW_EXTENSION: &str = "jpg";
const DOWNLOAD_CONCURRENCY: usize = 4;
const DOWNLOAD_RETRIES: u32 = 1;

static DRIVE_PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([^/?#]+)").expect("drive path pattern should compile"));

/// Deterministic file stem for the photo on row `index`:
/// `photo_<timestamp>_<index>`, with `/` and `:` removed, spaces turned into
/// `_`, and any other path-unsafe character replaced by `_`.
pub fn photo_stem(timestamp: &str, index: usize) -> String {
    let safe: String = timestamp
        .chars()
        .filter(|c| !matches!(c, '/' | ':'))
        .map(|c| match c {
            ' ' | '\\' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("photo_{}_{}", safe, index)
}

/// Google Drive file id from either `...?id=<ID>` or `.../d/<ID>/...` links.
pub fn drive_file_id(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "id") {
            if !id.is_empty() {
                return Some(id.into_owned());
            }
        }
    }
    DRIVE_PATH_ID
        .captures(url)
        .map(|caps| caps[1].to_string())
        .filter(|id| !id.is_empty())
}

pub fn drive_download_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", file_id)
}

/// A photo that should exist in the raw cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoJob {
    pub index: usize,
    pub source_url: String,
    pub dest: PathBuf,
}

/// One job per row with a photo URL, in table order.
pub fn photo_jobs(table: &CanonicalTable, raw_dir: &Path) -> Vec<PhotoJob> {
    table
        .iter()
        .enumerate()
        .filter(|(_, r)| !is_blank(&r.photo))
        .map(|(index, r)| PhotoJob {
            index,
            source_url: r.photo.trim().to_string(),
            dest: raw_dir.join(format!("{}.{}", photo_stem(&r.timestamp, index), RAW_EXTENSION)),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

async fn download_one(client: &Client, job: &PhotoJob) -> Result<()> {
    let id = drive_file_id(&job.source_url)
        .ok_or_else(|| anyhow!("no Drive file id in {}", job.source_url))?;
    let url = Url::parse(&drive_download_url(&id))?;
    let bytes = get_bytes_with_retry(client, &url, DOWNLOAD_RETRIES, INITIAL_BACKOFF_MS).await?;
    write_atomically(&job.dest, &bytes).await
}

/// Write through a `.tmp` sibling and rename, so `dest` only ever exists
/// complete. A failed write leaves no file that would later pass as cached.
async fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = dest.with_extension("tmp");
    if let Err(e) = fs::write(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("writing {}", tmp.display()));
    }
    fs::rename(&tmp, dest)
        .await
        .with_context(|| format!("moving {} into place", dest.display()))
}

/// Download every photo not yet in `raw_dir`. Individual failures are logged
/// and counted, never propagated.
#[instrument(level = "info", skip(client, table, raw_dir), fields(raw_dir = %raw_dir.as_ref().display()))]
pub async fn download_photos<P: AsRef<Path>>(
    client: &Client,
    table: &CanonicalTable,
    raw_dir: P,
) -> Result<DownloadReport> {
    let raw_dir = raw_dir.as_ref();
    fs::create_dir_all(raw_dir)
        .await
        .with_context(|| format!("creating {}", raw_dir.display()))?;

    let mut report = DownloadReport::default();
    let mut pending = Vec::new();
    for job in photo_jobs(table, raw_dir) {
        if fs::try_exists(&job.dest).await.unwrap_or(false) {
            info!(file = %job.dest.display(), "already cached");
            report.skipped += 1;
        } else {
            pending.push(job);
        }
    }

    let results: Vec<(PhotoJob, Result<()>)> = stream::iter(pending)
        .map(|job| async move {
            let res = download_one(client, &job).await;
            (job, res)
        })
        .buffer_unordered(DOWNLOAD_CONCURRENCY)
        .collect()
        .await;

    for (job, res) in results {
        match res {
            Ok(()) => {
                info!(file = %job.dest.display(), "downloaded");
                report.downloaded += 1;
            }
            Err(e) => {
                error!(row = job.index, url = %job.source_url, error = %e, "photo download failed");
                report.failed += 1;
            }
        }
    }

    if report.downloaded == 0 {
        info!("no new photos to download");
    }
    if report.failed > 0 {
        warn!(failed = report.failed, "some photos could not be downloaded");
    }
    Ok(report)
}
