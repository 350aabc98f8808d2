// src/config.rs
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::normalize::{NormalizeOptions, ANONYMOUS, DEFAULT_PHOTO_COLUMN};
use crate::photos::resize::{ImageOptions, OutputFormat};

/// Command-line and environment options for one build.
#[derive(Debug, Clone, Parser)]
#[command(name = "memorial-site", version, about = "Build the memorial site from form exports")]
pub struct BuildConfig {
    /// Published CSV export of the comments form
    #[arg(long, env = "CSV_URL")]
    pub csv_url: Option<String>,

    /// Published CSV export of the photos form
    #[arg(long, env = "PHOTOS_CSV_URL")]
    pub photos_csv_url: Option<String>,

    /// Use the cached exports under data/ instead of fetching
    #[arg(long)]
    pub skip_fetch: bool,

    /// Do not download submitted photos
    #[arg(long)]
    pub skip_download: bool,

    /// Project root holding content/, data/, static/ and config.json
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    #[arg(long, default_value_t = 1200)]
    pub max_width: u32,

    #[arg(long, default_value_t = 800)]
    pub max_height: u32,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Output image format: webp or jpg
    #[arg(long, default_value = "webp")]
    pub format: OutputFormat,

    /// Exact header of the upload column on the photos form
    #[arg(long, default_value = DEFAULT_PHOTO_COLUMN)]
    pub photo_column: String,

    /// Display name for submitters who left the name blank
    #[arg(long, default_value = ANONYMOUS)]
    pub anonymous_name: String,
}

impl BuildConfig {
    /// Defaults rooted at `base_dir`, no URLs.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_url: None,
            photos_csv_url: None,
            skip_fetch: false,
            skip_download: false,
            base_dir: base_dir.into(),
            max_width: 1200,
            max_height: 800,
            quality: 85,
            format: OutputFormat::Webp,
            photo_column: DEFAULT_PHOTO_COLUMN.to_string(),
            anonymous_name: ANONYMOUS.to_string(),
        }
    }

    pub fn paths(&self) -> Paths {
        Paths::new(&self.base_dir)
    }

    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: self.quality,
            format: self.format,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            photo_column: self.photo_column.clone(),
            anonymous_name: self.anonymous_name.clone(),
        }
    }
}

/// Directory layout of a site project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub content_dir: PathBuf,
    pub data_dir: PathBuf,
    pub raw_images_dir: PathBuf,
    pub static_dir: PathBuf,
    pub output_images_dir: PathBuf,
    pub public_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Paths {
    pub fn new(base: &Path) -> Self {
        let static_dir = base.join("static");
        Self {
            content_dir: base.join("content"),
            data_dir: base.join("data"),
            raw_images_dir: base.join("raw_images"),
            output_images_dir: static_dir.join("images"),
            static_dir,
            public_dir: base.join("public"),
            config_file: base.join("config.json"),
        }
    }

    pub fn comments_cache(&self) -> PathBuf {
        self.data_dir.join("comments.csv")
    }

    pub fn photos_cache(&self) -> PathBuf {
        self.data_dir.join("photos.csv")
    }

    /// Create the directories every build writes into.
    pub fn ensure(&self) -> Result<()> {
        for d in [&self.data_dir, &self.output_images_dir, &self.public_dir] {
            fs::create_dir_all(d).with_context(|| format!("creating {}", d.display()))?;
            info!(dir = %d.display(), "directory ready");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub title: String,
    pub description: String,
    pub shop_name: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "想い出のラーメン - メモリアルサイト".to_string(),
            description: "故人を偲ぶメモリアルサイト".to_string(),
            shop_name: "想い出のラーメン".to_string(),
        }
    }
}

/// `config.json`: site identity plus free-form blocks passed to the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteInfo,
    pub hero: Map<String, Value>,
    pub navigation: Map<String, Value>,
    pub sections: Map<String, Value>,
    pub footer: Map<String, Value>,
    pub ui: Map<String, Value>,
}

/// Read `config.json`. Missing or unreadable files fall back to defaults.
pub fn load_site_config<P: AsRef<Path>>(path: P) -> SiteConfig {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "config file not found; using defaults");
        return SiteConfig::default();
    }
    let parsed = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))
        .and_then(|text| {
            serde_json::from_str::<SiteConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))
        });
    match parsed {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "config file unusable; using defaults");
            SiteConfig::default()
        }
    }
}
