// src/render.rs
use anyhow::{Context, Result};
use glob::glob;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

use crate::comments::CommentEntry;
use crate::config::SiteConfig;
use crate::content::StoreEntry;
use crate::menu::VoteTally;

pub const CONTEXT_FILE: &str = "site.json";

/// Everything the page template reads.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub site_title: String,
    pub site_description: String,
    pub shop_name: String,
    pub hero: Map<String, Value>,
    pub navigation: Map<String, Value>,
    pub sections: Map<String, Value>,
    pub footer: Map<String, Value>,
    pub ui: Map<String, Value>,
    pub comments: Vec<CommentEntry>,
    pub images: Vec<String>,
    pub about_html: String,
    pub store_history: Vec<StoreEntry>,
    pub menu_ranking: VoteTally,
    pub generated_at: String,
    pub comment_count: usize,
    pub image_count: usize,
}

impl SiteContext {
    pub fn new(
        config: SiteConfig,
        comments: Vec<CommentEntry>,
        images: Vec<String>,
        about_html: String,
        store_history: Vec<StoreEntry>,
        menu_ranking: VoteTally,
        generated_at: String,
    ) -> Self {
        Self {
            site_title: config.site.title,
            site_description: config.site.description,
            shop_name: config.site.shop_name,
            hero: config.hero,
            navigation: config.navigation,
            sections: config.sections,
            footer: config.footer,
            ui: config.ui,
            comment_count: comments.len(),
            image_count: images.len(),
            comments,
            images,
            about_html,
            store_history,
            menu_ranking,
            generated_at,
        }
    }
}

/// Write the context as `public/site.json` for the template step.
#[instrument(level = "info", skip_all, fields(public = %public_dir.as_ref().display()))]
pub fn write_context<P: AsRef<Path>>(ctx: &SiteContext, public_dir: P) -> Result<PathBuf> {
    let public_dir = public_dir.as_ref();
    fs::create_dir_all(public_dir)
        .with_context(|| format!("creating {}", public_dir.display()))?;
    let path = public_dir.join(CONTEXT_FILE);
    let json = serde_json::to_string_pretty(ctx).context("serializing site context")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), comments = ctx.comment_count, images = ctx.image_count, "wrote site context");
    Ok(path)
}

fn copy_matching(pattern: &str, dest_dir: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in glob(pattern).with_context(|| format!("bad glob {}", pattern))? {
        let src = match entry {
            Ok(p) if p.is_file() => p,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "unreadable path while copying");
                continue;
            }
        };
        let Some(name) = src.file_name() else {
            continue;
        };
        fs::create_dir_all(dest_dir).with_context(|| format!("creating {}", dest_dir.display()))?;
        fs::copy(&src, dest_dir.join(name))
            .with_context(|| format!("copying {}", src.display()))?;
        copied += 1;
    }
    Ok(copied)
}

/// Copy stylesheets and processed images into `public/static/`.
/// Returns the number of files copied.
pub fn copy_static_files<P: AsRef<Path>, Q: AsRef<Path>>(static_dir: P, public_dir: Q) -> Result<usize> {
    let static_dir = static_dir.as_ref();
    let dest = public_dir.as_ref().join("static");

    let css = copy_matching(
        &format!("{}/css/*.css", static_dir.display()),
        &dest.join("css"),
    )?;
    let images = copy_matching(
        &format!("{}/images/*", static_dir.display()),
        &dest.join("images"),
    )?;
    info!(css, images, "copied static files");
    Ok(css + images)
}
