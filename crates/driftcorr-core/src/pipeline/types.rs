use serde::{Deserialize, Serialize};

use crate::correlate::PairEstimate;
use crate::shift::CorrectedStack;
use crate::trajectory::{DenseShifts, HalfMatrices, MaskedPairs, ShiftTrajectory};

use super::config::DriftConfig;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Filtering,
    Correlating,
    Solving,
    Interpolating,
    Shifting,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filtering => write!(f, "Filtering frames"),
            Self::Correlating => write!(f, "Correlating pairs"),
            Self::Solving => write!(f, "Solving trajectory"),
            Self::Interpolating => write!(f, "Interpolating shifts"),
            Self::Shifting => write!(f, "Shifting frames"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (frames or pair blocks), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Intermediate results of drift estimation.
#[derive(Clone, Debug)]
pub struct DriftEstimate {
    pub half: HalfMatrices,
    pub masked: MaskedPairs,
    pub trajectory: ShiftTrajectory,
    pub shifts: DenseShifts,
}

/// Result of a full drift-correction run.
#[derive(Clone, Debug)]
pub struct DriftOutput {
    pub corrected: CorrectedStack,
    pub estimate: DriftEstimate,
}

/// Serializable summary of a run for inspection and plotting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriftReport {
    pub config: DriftConfig,
    pub total_frames: usize,
    /// Stack indices of the sampled frames.
    pub sampled: Vec<usize>,
    /// Normalized pair weights, row-major per sampled frame.
    pub normalized_weights: Vec<Vec<f64>>,
    pub dx: Vec<Vec<f64>>,
    pub dy: Vec<Vec<f64>>,
    pub surviving_pairs: usize,
    pub trajectory: ShiftTrajectory,
    pub shifts: DenseShifts,
    pub margins: Option<(usize, usize)>,
    pub drift_corrected: bool,
}

impl DriftReport {
    pub fn new(config: &DriftConfig, total_frames: usize, estimate: &DriftEstimate) -> Self {
        let rows = |m: &ndarray::Array2<f64>| -> Vec<Vec<f64>> {
            m.rows().into_iter().map(|r| r.to_vec()).collect()
        };
        Self {
            config: config.clone(),
            total_frames,
            sampled: estimate.half.nr.clone(),
            normalized_weights: rows(&estimate.half.normalized_weights()),
            dx: rows(&estimate.half.dx),
            dy: rows(&estimate.half.dy),
            surviving_pairs: estimate.masked.surviving_pairs(),
            trajectory: estimate.trajectory.clone(),
            shifts: estimate.shifts.clone(),
            margins: None,
            drift_corrected: false,
        }
    }

    /// Record the padding and provenance of a corrected stack.
    pub fn with_correction(mut self, corrected: &CorrectedStack) -> Self {
        self.margins = Some(corrected.margins);
        self.drift_corrected = corrected.drift_corrected;
        self
    }

    /// Pair estimate between sampled positions `i` and `j`.
    pub fn pair(&self, i: usize, j: usize) -> Option<PairEstimate> {
        Some(PairEstimate {
            weight: *self.normalized_weights.get(i)?.get(j)?,
            dy: *self.dy.get(i)?.get(j)?,
            dx: *self.dx.get(i)?.get(j)?,
        })
    }
}
