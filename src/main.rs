use anyhow::Result;
use clap::Parser;
use memorial_site::{build, config::BuildConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) options ──────────────────────────────────────────────────
    let config = BuildConfig::parse();
    info!(base = %config.base_dir.display(), skip_fetch = config.skip_fetch, "startup");

    // ─── 3) build ────────────────────────────────────────────────────
    match build::run(&config).await {
        Ok(summary) => {
            info!(
                comments = summary.comments,
                images = summary.images,
                photos_downloaded = summary.photos.downloaded,
                photos_failed = summary.photos.failed,
                context = %summary.context_path.display(),
                "all done"
            );
            Ok(())
        }
        Err(e) => {
            error!("build failed: {:#}", e);
            Err(e)
        }
    }
}
