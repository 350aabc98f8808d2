// src/build.rs
//! One build pass: exports → canonical table → tally → page context.

use anyhow::{bail, Context, Result};
use chrono::Local;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::comments::prepare_comments;
use crate::config::{load_site_config, BuildConfig};
use crate::content::load_about;
use crate::fetch::{fetch_form_csv, load_cached};
use crate::menu::aggregate_menu_items;
use crate::normalize::{normalize_form, CanonicalTable, FormKind, NormalizeOptions};
use crate::photos::{download_photos, resize::process_images, DownloadReport};
use crate::render::{copy_static_files, write_context, SiteContext};
use crate::table::RawTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub comments: usize,
    pub images: usize,
    pub menu_items: usize,
    pub photos: DownloadReport,
    pub context_path: PathBuf,
}

async fn load_source(
    client: &Client,
    url: Option<&str>,
    cache: &Path,
    skip_fetch: bool,
) -> Result<RawTable> {
    match url {
        Some(url) if !skip_fetch => fetch_form_csv(client, url, cache).await,
        _ => load_cached(cache),
    }
}

/// Normalize both exports and append the photos rows after the comments rows.
pub fn merge_sources(
    comments: &RawTable,
    photos: &RawTable,
    opts: &NormalizeOptions,
) -> Result<CanonicalTable> {
    let comments = normalize_form(comments, FormKind::Comments, opts)
        .context("normalizing comments form")?;
    let photos =
        normalize_form(photos, FormKind::Photos, opts).context("normalizing photos form")?;
    info!(comments = comments.len(), photos = photos.len(), "normalized form exports");
    Ok(comments.merge(photos))
}

#[instrument(level = "info", skip_all, fields(base = %config.base_dir.display()))]
pub async fn run(config: &BuildConfig) -> Result<BuildSummary> {
    let paths = config.paths();
    paths.ensure()?;
    let site = load_site_config(&paths.config_file);

    if config.csv_url.is_none() && !config.skip_fetch {
        bail!(
            "no CSV URL configured: set CSV_URL, pass --csv-url, or use --skip-fetch to build from data/comments.csv"
        );
    }

    // ─── exports ─────────────────────────────────────────────────────
    let client = Client::new();
    let comments_raw = load_source(
        &client,
        config.csv_url.as_deref(),
        &paths.comments_cache(),
        config.skip_fetch,
    )
    .await?;
    let photos_raw = load_source(
        &client,
        config.photos_csv_url.as_deref(),
        &paths.photos_cache(),
        config.skip_fetch,
    )
    .await?;

    // ─── normalize + tally ───────────────────────────────────────────
    let table = merge_sources(&comments_raw, &photos_raw, &config.normalize_options())?;
    let tally = aggregate_menu_items(&table);
    for (rank, (item, count)) in tally.top(5).enumerate() {
        info!(rank = rank + 1, item, count, "menu ranking");
    }

    // ─── photos ──────────────────────────────────────────────────────
    let photos = if config.skip_download {
        info!("photo download skipped");
        DownloadReport::default()
    } else {
        download_photos(&client, &table, &paths.raw_images_dir).await?
    };

    let images = tokio::task::spawn_blocking({
        let raw = paths.raw_images_dir.clone();
        let out = paths.output_images_dir.clone();
        let opts = config.image_options();
        move || process_images(raw, out, &opts)
    })
    .await
    .context("image processing task panicked")??;

    // ─── page ────────────────────────────────────────────────────────
    let (about_html, store_history) = load_about(paths.content_dir.join("about.md"))?;
    if store_history.is_empty() {
        warn!("no store history found in about.md");
    }
    let comments = prepare_comments(&table, config.format);
    let ctx = SiteContext::new(
        site,
        comments,
        images,
        about_html,
        store_history,
        tally,
        Local::now().format("%Y年%m月%d日 %H:%M").to_string(),
    );
    let context_path = write_context(&ctx, &paths.public_dir)?;
    copy_static_files(&paths.static_dir, &paths.public_dir)?;

    let summary = BuildSummary {
        comments: ctx.comment_count,
        images: ctx.image_count,
        menu_items: ctx.menu_ranking.len(),
        photos,
        context_path,
    };
    info!(
        comments = summary.comments,
        images = summary.images,
        menu_items = summary.menu_items,
        output = %paths.public_dir.display(),
        "build complete"
    );
    Ok(summary)
}
