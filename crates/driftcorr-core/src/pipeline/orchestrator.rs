use std::sync::Arc;

use tracing::info;

use crate::context::DriftContext;
use crate::correlate::PairwiseCorrelator;
use crate::error::{DriftError, Result};
use crate::frame::FrameStack;
use crate::preprocess::preprocess_frames;
use crate::shift::apply_shifts;
use crate::trajectory::{calc_shift_vectors, interpolate_shifts, threshold_and_mask, HalfMatrices};

use super::types::{DriftEstimate, DriftOutput, PipelineStage, ProgressReporter};

/// Progress callback that forwards completed-item counts to the reporter.
fn advance_with(reporter: &Arc<dyn ProgressReporter>) -> impl Fn(usize) + Send + Sync {
    let r = reporter.clone();
    move |done| r.advance(done)
}

/// Estimate the per-frame drift of `stack` without touching the frames.
///
/// Filters the sampled frames, correlates every pair of them, solves for a
/// consistent trajectory and resamples it to every frame of the stack.
pub fn estimate_drift(stack: &FrameStack, ctx: &DriftContext) -> Result<DriftEstimate> {
    let config = &ctx.config;
    let reporter = ctx.reporter();
    let (h, w) = stack.dim();
    let extent = config.validate_for(h, w)?;

    let sampled = config.sampled_indices(stack.len());
    if sampled.len() < 2 {
        return Err(DriftError::InsufficientOverlap {
            surviving: sampled.len(),
            components: sampled.len(),
        });
    }
    let correlator = PairwiseCorrelator::new(
        extent.fftsize,
        config.window(),
        config.block_size,
        config.peak_refinement,
    )?
    .with_upsample_factor(config.upsample_factor);
    info!(
        total_frames = stack.len(),
        sampled = sampled.len(),
        stride = config.stride,
        fftsize = extent.fftsize,
        sigma = config.sigma,
        refinement = %config.peak_refinement,
        threads = ctx.num_threads(),
        "Estimating drift"
    );

    reporter.begin_stage(PipelineStage::Filtering, Some(sampled.len()));
    let filtered = ctx.install(|| {
        preprocess_frames(stack, &sampled, &extent, config.sigma, advance_with(reporter))
    })?;
    reporter.finish_stage();

    let blocks = correlator.blocks(filtered.len()).len();
    reporter.begin_stage(PipelineStage::Correlating, Some(blocks));
    let pairs = ctx.install(|| correlator.correlate_all(&filtered, advance_with(reporter)))?;
    drop(filtered);
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Solving, None);
    let half = HalfMatrices::from_pairs(sampled, &pairs)?;
    let masked = threshold_and_mask(&half, config.min_normed_weight)?;
    info!(
        surviving_frames = masked.len(),
        surviving_pairs = masked.surviving_pairs(),
        min_normed_weight = config.min_normed_weight,
        "Masked pairs"
    );
    let trajectory = calc_shift_vectors(&masked, config.weight_power)?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Interpolating, None);
    let shifts = interpolate_shifts(
        &trajectory.coords,
        &trajectory.dx,
        &trajectory.dy,
        stack.len(),
    )?;
    reporter.finish_stage();

    Ok(DriftEstimate {
        half,
        masked,
        trajectory,
        shifts,
    })
}

/// Estimate drift and apply it, producing the corrected stack.
pub fn run_drift_correction(stack: &FrameStack, ctx: &DriftContext) -> Result<DriftOutput> {
    let estimate = estimate_drift(stack, ctx)?;

    let reporter = ctx.reporter();
    reporter.begin_stage(PipelineStage::Shifting, Some(stack.len()));
    let corrected = ctx.install(|| apply_shifts(stack, &estimate.shifts, advance_with(reporter)))?;
    reporter.finish_stage();

    let (h, w) = corrected.dim();
    info!(width = w, height = h, "Drift correction complete");

    Ok(DriftOutput {
        corrected,
        estimate,
    })
}
