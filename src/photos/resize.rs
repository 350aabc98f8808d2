// src/photos/resize.rs
use anyhow::{anyhow, Context, Result};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::{self, File},
    io::BufWriter,
    path::Path,
    str::FromStr,
};
use tracing::{error, info, instrument, warn};

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Jpg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(OutputFormat::Webp),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpg),
            other => Err(anyhow!("unsupported output format `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100. The WebP encoder is lossless and ignores it.
    pub quality: u8,
    pub format: OutputFormat,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_width: 1200,
            max_height: 800,
            quality: 85,
            format: OutputFormat::Webp,
        }
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| ext.eq_ignore_ascii_case(s))
        })
}

/// Shrink `img` to fit the bounds, keeping its aspect ratio. Never upscales.
pub fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if img.width() <= max_width && img.height() <= max_height {
        img
    } else {
        img.resize(max_width, max_height, FilterType::Lanczos3)
    }
}

/// Resize one image and write it to `dest` in `opts.format`.
pub fn process_image(src: &Path, dest: &Path, opts: &ImageOptions) -> Result<()> {
    let img = image::open(src).with_context(|| format!("decoding {}", src.display()))?;
    let rgb = fit_within(img, opts.max_width, opts.max_height).to_rgb8();

    match opts.format {
        OutputFormat::Webp => rgb
            .save_with_format(dest, ImageFormat::WebP)
            .with_context(|| format!("encoding {}", dest.display()))?,
        OutputFormat::Jpg => {
            let out = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
            let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(out), opts.quality);
            encoder
                .encode_image(&rgb)
                .with_context(|| format!("encoding {}", dest.display()))?;
        }
    }
    Ok(())
}

/// Convert every supported image in `raw_dir` into `out_dir`, returning the
/// written file names sorted. Files that fail to convert are logged and skipped.
#[instrument(level = "info", skip_all, fields(raw = %raw_dir.as_ref().display()))]
pub fn process_images<P: AsRef<Path>, Q: AsRef<Path>>(
    raw_dir: P,
    out_dir: Q,
    opts: &ImageOptions,
) -> Result<Vec<String>> {
    let raw_dir = raw_dir.as_ref();
    let out_dir = out_dir.as_ref();
    let mut processed = Vec::new();

    if !raw_dir.is_dir() {
        warn!("raw image directory not found");
        return Ok(processed);
    }
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    for entry in fs::read_dir(raw_dir).with_context(|| format!("reading {}", raw_dir.display()))? {
        let path = entry?.path();
        if !path.is_file() || !is_supported(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let file_name = format!("{}.{}", stem, opts.format.extension());
        let dest = out_dir.join(&file_name);

        match process_image(&path, &dest, opts) {
            Ok(()) => {
                info!(src = %path.display(), dest = %file_name, "image processed");
                processed.push(file_name);
            }
            Err(e) => error!(src = %path.display(), error = %e, "image processing failed"),
        }
    }

    processed.sort();
    info!(count = processed.len(), "images processed");
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn write_png(path: &Path, w: u32, h: u32) -> Result<()> {
        let img = RgbaImage::from_pixel(w, h, Rgba([200, 100, 50, 128]));
        img.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    #[test]
    fn fit_keeps_aspect_ratio_and_never_upscales() {
        let big = DynamicImage::new_rgb8(2400, 800);
        let fitted = fit_within(big, 1200, 800);
        assert_eq!((fitted.width(), fitted.height()), (1200, 400));

        let small = DynamicImage::new_rgb8(300, 200);
        let fitted = fit_within(small, 1200, 800);
        assert_eq!((fitted.width(), fitted.height()), (300, 200));
    }

    #[test]
    fn processes_supported_files_and_skips_the_rest() -> Result<()> {
        let tmp = tempdir()?;
        let raw = tmp.path().join("raw_images");
        let out = tmp.path().join("static/images");
        fs::create_dir_all(&raw)?;
        write_png(&raw.join("photo_b_1.png"), 1600, 1600)?;
        write_png(&raw.join("photo_a_0.png"), 40, 20)?;
        fs::write(raw.join("notes.txt"), "not an image")?;
        fs::write(raw.join("broken.jpg"), "not a jpeg either")?;

        let opts = ImageOptions {
            format: OutputFormat::Jpg,
            ..Default::default()
        };
        let names = process_images(&raw, &out, &opts)?;
        assert_eq!(names, vec!["photo_a_0.jpg", "photo_b_1.jpg"]);

        let resized = image::open(out.join("photo_b_1.jpg"))?;
        assert_eq!((resized.width(), resized.height()), (800, 800));
        Ok(())
    }

    #[test]
    fn missing_raw_dir_is_not_an_error() -> Result<()> {
        let tmp = tempdir()?;
        let names = process_images(tmp.path().join("nope"), tmp.path().join("out"), &ImageOptions::default())?;
        assert!(names.is_empty());
        Ok(())
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpg);
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert!("tiff".parse::<OutputFormat>().is_err());
    }
}
