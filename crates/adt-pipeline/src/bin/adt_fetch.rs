//! Fetch stage: download recordings listed in a manifest and extract frames.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use adt_media::SamplingRate;
use adt_pipeline::{init_tracing, run_fetch_stage, PipelineConfig};

#[derive(Debug, Parser)]
#[command(name = "adt-fetch", version, about = "Download ADT recordings and extract frames")]
struct Args {
    /// Asset manifest (JSON) listing recordings and their download URLs.
    #[arg(long = "json_path")]
    json_path: PathBuf,

    /// Dataset root; one subdirectory per recording.
    #[arg(long = "dataset_dir")]
    dataset_dir: Option<PathBuf>,

    /// Maximum number of recordings to fetch.
    #[arg(long = "max_download")]
    max_download: Option<usize>,

    /// Frame sampling: all, every:N, fps:F or uniform:N.
    #[arg(long)]
    sampling: Option<SamplingRate>,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout_secs")]
    timeout_secs: Option<u64>,
}

impl Args {
    fn apply(self, mut config: PipelineConfig) -> (PipelineConfig, PathBuf) {
        if let Some(dir) = self.dataset_dir {
            config.dataset_dir = dir;
        }
        if let Some(n) = self.max_download {
            config.max_download = n;
        }
        if let Some(sampling) = self.sampling {
            config.sampling = sampling;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        (config, self.json_path)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let (config, manifest_path) = args.apply(PipelineConfig::from_env());
    info!("Fetch config: {:?}", config);

    let report = match run_fetch_stage(&config, &manifest_path).await {
        Ok(report) => report,
        Err(e) => {
            error!("Fetch stage failed: {}", e);
            std::process::exit(1);
        }
    };

    report.log_summary();

    if !report.is_success() {
        error!("No recording was fully fetched");
        std::process::exit(1);
    }
}
