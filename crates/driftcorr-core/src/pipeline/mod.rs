pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{estimate_drift, run_drift_correction};
pub use types::{
    DriftEstimate, DriftOutput, DriftReport, NoOpReporter, PipelineStage, ProgressReporter,
};
