use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use driftcorr_core::context::DriftContext;
use driftcorr_core::io::{
    save_image_sequence, write_corrected_ser, write_report_json, write_shift_table,
};
use driftcorr_core::pipeline::{run_drift_correction, DriftReport};
use driftcorr_core::shift::CorrectedStack;
use tracing::info;

use super::DriftArgs;
use crate::input::load_stack;
use crate::progress::BarReporter;
use crate::summary::{print_estimate_summary, print_run_summary};

#[derive(Args)]
pub struct CorrectArgs {
    /// Input SER file or image directory
    pub input: PathBuf,

    #[command(flatten)]
    pub drift: DriftArgs,

    /// Output SER file, or a directory for a TIFF sequence
    #[arg(short, long, default_value = "corrected.ser")]
    pub output: PathBuf,

    /// Write the full report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write per-frame shifts as CSV
    #[arg(long)]
    pub shifts: Option<PathBuf>,
}

pub fn run(args: &CorrectArgs) -> Result<()> {
    let config = args.drift.resolve()?;
    let stack = load_stack(&args.input)?;

    let ctx = DriftContext::new(config.clone())?.with_reporter(Arc::new(BarReporter::new()));
    print_run_summary(&config, &args.input, &stack, ctx.num_threads());

    let output = run_drift_correction(&stack, &ctx).context("Drift correction failed")?;
    print_estimate_summary(&output.estimate);
    drop(stack);

    write_output(&output.corrected, &args.output)?;
    let (h, w) = output.corrected.dim();
    println!(
        "Corrected {} frames ({}x{}) saved to {}",
        output.corrected.frames.len(),
        w,
        h,
        args.output.display()
    );

    if let Some(ref path) = args.shifts {
        write_shift_table(&output.estimate.shifts, path)
            .with_context(|| format!("Failed to write shifts to {}", path.display()))?;
        println!("Shifts saved to {}", path.display());
    }
    if let Some(ref path) = args.report {
        let report = DriftReport::new(&config, output.corrected.frames.len(), &output.estimate)
            .with_correction(&output.corrected);
        write_report_json(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}

fn write_output(corrected: &CorrectedStack, path: &Path) -> Result<()> {
    let is_ser = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ser"));

    if is_ser {
        write_corrected_ser(path, corrected)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        let files = save_image_sequence(&corrected.frames, path, "frame", "tif")
            .with_context(|| format!("Failed to write frames to {}", path.display()))?;
        info!(files = files.len(), dir = %path.display(), "Wrote image sequence");
    }
    Ok(())
}
