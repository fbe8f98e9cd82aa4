//! ADT dataset preparation pipeline.
//!
//! Two stages share a [`PipelineConfig`]:
//! - fetch: manifest → bundle download → frame extraction
//! - prepare: annotation normalization → training records → `dataset.json`

pub mod builder;
pub mod config;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod report;
pub mod stages;

pub use builder::{build_records, write_records, BuildOptions, BuildOutput, OUTPUT_FILE};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::{init_tracing, RecordingLogger};
pub use prompt::{PromptTemplate, DEFAULT_PROMPT_TEMPLATE};
pub use report::{
    ExclusionReason, ExtractionStatus, FetchStageReport, PrepareReport, RecordingExtraction,
    RecordingOutcome, RecordingResult,
};
pub use stages::{run_fetch_stage, run_prepare_stage};
