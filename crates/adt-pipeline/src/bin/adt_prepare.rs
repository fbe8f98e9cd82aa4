//! Prepare stage: build training records from a fetched dataset.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use adt_pipeline::{init_tracing, run_prepare_stage, PipelineConfig, PromptTemplate};

#[derive(Debug, Parser)]
#[command(name = "adt-prepare", version, about = "Build the VLM training dataset from fetched recordings")]
struct Args {
    /// Dataset root produced by the fetch stage.
    #[arg(long = "dataset_dir")]
    dataset_dir: Option<PathBuf>,

    /// Directory receiving dataset.json.
    #[arg(long = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Prompt template; `{objects}` and `{activity}` are substituted.
    #[arg(long = "prompt_template")]
    prompt_template: Option<String>,

    /// Annotation stream to keep; pass an empty string to keep all streams.
    #[arg(long = "stream_id")]
    stream_id: Option<String>,

    /// Minimum visibility ratio for an annotation row to count.
    #[arg(long = "min_visibility")]
    min_visibility: Option<f64>,

    /// Write absolute image paths.
    #[arg(long = "absolute_paths")]
    absolute_paths: bool,
}

impl Args {
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(dir) = self.dataset_dir {
            config.dataset_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(template) = self.prompt_template {
            config.prompt_template = PromptTemplate::new(template);
        }
        if let Some(stream) = self.stream_id {
            config.stream_id = Some(stream.trim().to_string()).filter(|s| !s.is_empty());
        }
        if let Some(min) = self.min_visibility {
            config.min_visibility = min;
        }
        if self.absolute_paths {
            config.absolute_image_paths = true;
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Args::parse().apply(PipelineConfig::from_env());
    info!("Prepare config: {:?}", config);

    match run_prepare_stage(&config).await {
        Ok(report) => report.log_summary(),
        Err(e) => {
            error!("Prepare stage failed: {}", e);
            std::process::exit(1);
        }
    }
}
