use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use driftcorr_core::context::DriftContext;
use driftcorr_core::io::{write_report_json, write_shift_table};
use driftcorr_core::pipeline::{estimate_drift, DriftReport};

use super::DriftArgs;
use crate::input::load_stack;
use crate::progress::BarReporter;
use crate::summary::{print_estimate_summary, print_run_summary};

#[derive(Args)]
pub struct EstimateArgs {
    /// Input SER file or image directory
    pub input: PathBuf,

    #[command(flatten)]
    pub drift: DriftArgs,

    /// Write the full report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write per-frame shifts as CSV
    #[arg(long)]
    pub shifts: Option<PathBuf>,
}

pub fn run(args: &EstimateArgs) -> Result<()> {
    let config = args.drift.resolve()?;
    let stack = load_stack(&args.input)?;

    let ctx = DriftContext::new(config.clone())?.with_reporter(Arc::new(BarReporter::new()));
    print_run_summary(&config, &args.input, &stack, ctx.num_threads());

    let estimate = estimate_drift(&stack, &ctx).context("Drift estimation failed")?;
    print_estimate_summary(&estimate);

    if let Some(ref path) = args.shifts {
        write_shift_table(&estimate.shifts, path)
            .with_context(|| format!("Failed to write shifts to {}", path.display()))?;
        println!("Shifts saved to {}", path.display());
    }
    if let Some(ref path) = args.report {
        let report = DriftReport::new(&config, stack.len(), &estimate);
        write_report_json(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}
