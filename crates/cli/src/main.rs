//! `trek-author` -- author a trek from a JSON manifest.
//!
//! Walks the five wizard steps against the trek backend: basic info,
//! services, highlights, activities and images. Stops with a non-zero
//! exit code and the backend's message at the first failure; whatever
//! was saved before that point stays saved.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default                     | Description                |
//! |-------------------------|----------|-----------------------------|----------------------------|
//! | `TREK_API_URL`          | no       | `http://localhost:8080/api` | Backend base URL           |
//! | `TREK_API_TIMEOUT_SECS` | no       | `30`                        | Per-request timeout        |
//! | `TREK_API_TOKEN`        | no       | --                          | Bearer token               |
//! | `TREK_API_USER_ID`      | no       | --                          | Acting user id             |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trek_cli::{run, CliError, Manifest, Summary};
use trek_gateway::{GatewayConfig, HttpGateway, MemoryGateway, ProgressReporter, UploadFile};

#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    /// Path to the trek manifest (JSON).
    manifest: PathBuf,

    /// Run against an empty in-memory backend instead of the API.
    #[clap(long)]
    offline: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trek_cli=info,trek_authoring=info,trek_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match author(&args).await {
        Ok(summary) => {
            tracing::info!(
                trek_id = summary.trek_id,
                services = summary.services,
                highlights = summary.highlights,
                activities = summary.activities,
                images = summary.images,
                primary_image = summary.primary_image,
                "Trek authored",
            );
            println!("{}", summary.trek_id);
        }
        Err(e) => {
            tracing::error!(error = %e, "Trek authoring failed");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

async fn author(args: &Args) -> Result<Summary, CliError> {
    let manifest = Manifest::load(&args.manifest)?;
    let base_dir = args.manifest.parent().unwrap_or(Path::new("."));
    let uploads = manifest.read_images(base_dir)?;
    let progress = progress_logger(&uploads);

    if args.offline {
        tracing::info!(manifest = %args.manifest.display(), "Starting offline run");
        return run(Arc::new(MemoryGateway::new()), manifest, uploads, progress).await;
    }

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        manifest = %args.manifest.display(),
        "Starting trek-author",
    );
    let gateway = HttpGateway::new(&config, Arc::new(config.session()))?;
    run(Arc::new(gateway), manifest, uploads, progress).await
}

/// Log upload progress in whole percent steps while images are sent.
fn progress_logger(uploads: &[UploadFile]) -> Option<ProgressReporter> {
    if uploads.is_empty() {
        return None;
    }
    let (reporter, mut rx) = ProgressReporter::channel();
    tokio::spawn(async move {
        let mut last = None;
        while rx.changed().await.is_ok() {
            let percent = rx.borrow_and_update().percent();
            if last != Some(percent) {
                tracing::debug!(percent, "Uploading images");
                last = Some(percent);
            }
        }
    });
    Some(reporter)
}
