use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BLOCK_SIZE, DEFAULT_FFTSIZE, DEFAULT_MIN_NORMED_WEIGHT, DEFAULT_SIGMA,
    DEFAULT_UPSAMPLE_FACTOR,
};
use crate::error::{DriftError, Result};
use crate::preprocess::Extent;

/// Optional sub-pixel refinement of each pairwise correlation peak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakRefinement {
    /// Integer argmax only; sub-pixel accuracy comes from the global
    /// least-squares fit.
    None,
    /// 1-D parabola fit through the peak and its neighbours on each axis.
    Parabolic,
    /// Correlation evaluated on a `1/upsample_factor` pixel grid around the
    /// integer peak by a matrix-multiply DFT.
    #[default]
    Upsampled,
}

impl std::fmt::Display for PeakRefinement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "Integer"),
            Self::Parabolic => write!(f, "Parabolic"),
            Self::Upsampled => write!(f, "Upsampled DFT"),
        }
    }
}

/// Parameters of a drift-correction run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Use every `stride`-th frame for the pairwise estimation.
    #[serde(default = "default_stride")]
    pub stride: usize,
    /// First frame considered for estimation.
    #[serde(default)]
    pub start: usize,
    /// One past the last frame considered for estimation (default: all).
    #[serde(default)]
    pub stop: Option<usize>,
    /// Frames per side of a square pair block.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Gaussian smoothing scale applied before edge detection.
    #[serde(default = "default_sigma")]
    pub sigma: f32,
    /// Half the side of the square analysis window.
    #[serde(default = "default_fftsize")]
    pub fftsize: usize,
    /// Largest offset searched for the correlation peak (default: `fftsize`).
    #[serde(default)]
    pub max_shift: Option<usize>,
    /// Window center as (row, col); defaults to the frame center.
    #[serde(default)]
    pub center: Option<(usize, usize)>,
    /// Explicit window bounds `(row_start, row_end, col_start, col_end)`.
    /// Takes precedence over `fftsize` and `center`.
    #[serde(default)]
    pub extent: Option<(usize, usize, usize, usize)>,
    /// Pairs with a normalized weight below this are discarded.
    #[serde(default = "default_min_normed_weight")]
    pub min_normed_weight: f64,
    /// Exponent applied to normalized weights in the least-squares fit.
    #[serde(default = "default_weight_power")]
    pub weight_power: f64,
    #[serde(default)]
    pub peak_refinement: PeakRefinement,
    /// Grid density of the upsampled peak search (peaks to `1/factor` px).
    #[serde(default = "default_upsample_factor")]
    pub upsample_factor: usize,
    /// Worker threads (default: one per core).
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_stride() -> usize {
    1
}
fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}
fn default_sigma() -> f32 {
    DEFAULT_SIGMA
}
fn default_fftsize() -> usize {
    DEFAULT_FFTSIZE
}
fn default_min_normed_weight() -> f64 {
    DEFAULT_MIN_NORMED_WEIGHT
}
fn default_weight_power() -> f64 {
    1.0
}
fn default_upsample_factor() -> usize {
    DEFAULT_UPSAMPLE_FACTOR
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            stride: default_stride(),
            start: 0,
            stop: None,
            block_size: DEFAULT_BLOCK_SIZE,
            sigma: DEFAULT_SIGMA,
            fftsize: DEFAULT_FFTSIZE,
            max_shift: None,
            center: None,
            extent: None,
            min_normed_weight: DEFAULT_MIN_NORMED_WEIGHT,
            weight_power: default_weight_power(),
            peak_refinement: PeakRefinement::default(),
            upsample_factor: DEFAULT_UPSAMPLE_FACTOR,
            threads: None,
        }
    }
}

impl DriftConfig {
    /// Check option ranges that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(DriftError::InvalidConfig("stride must be >= 1".into()));
        }
        if self.block_size == 0 {
            return Err(DriftError::InvalidConfig("block_size must be >= 1".into()));
        }
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(DriftError::InvalidConfig(format!(
                "sigma must be a positive number, got {}",
                self.sigma
            )));
        }
        if self.fftsize == 0 {
            return Err(DriftError::InvalidConfig("fftsize must be >= 1".into()));
        }
        if let Some(max_shift) = self.max_shift {
            if max_shift == 0 || (self.extent.is_none() && max_shift > self.fftsize) {
                return Err(DriftError::InvalidConfig(format!(
                    "max_shift must be in 1..={}, got {}",
                    self.fftsize, max_shift
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_normed_weight) {
            return Err(DriftError::InvalidConfig(format!(
                "min_normed_weight must be in [0, 1], got {}",
                self.min_normed_weight
            )));
        }
        if !(self.weight_power > 0.0 && self.weight_power.is_finite()) {
            return Err(DriftError::InvalidConfig(format!(
                "weight_power must be a positive number, got {}",
                self.weight_power
            )));
        }
        if self.upsample_factor == 0 {
            return Err(DriftError::InvalidConfig("upsample_factor must be >= 1".into()));
        }
        if self.threads == Some(0) {
            return Err(DriftError::InvalidConfig("threads must be >= 1".into()));
        }
        Ok(())
    }

    /// Validate against a concrete frame size and resolve the crop window.
    pub fn validate_for(&self, height: usize, width: usize) -> Result<Extent> {
        self.validate()?;
        let extent = match self.extent {
            Some(bounds) => Extent::from_bounds(bounds)?,
            None => {
                let center = self.center.unwrap_or((height / 2, width / 2));
                Extent::centered(center, self.fftsize)?
            }
        };
        extent.check_bounds(height, width)?;
        if self.window() > extent.fftsize {
            return Err(DriftError::InvalidConfig(format!(
                "max_shift {} exceeds the window half-size {}",
                self.window(),
                extent.fftsize
            )));
        }
        Ok(extent)
    }

    /// Offset search radius of the correlation window.
    pub fn window(&self) -> usize {
        let half = self.extent_half_size().unwrap_or(self.fftsize);
        self.max_shift.unwrap_or(half)
    }

    fn extent_half_size(&self) -> Option<usize> {
        self.extent
            .map(|(r0, r1, c0, c1)| r1.saturating_sub(r0).max(c1.saturating_sub(c0)) / 2)
    }

    /// Stack indices used for the pairwise estimation.
    pub fn sampled_indices(&self, total: usize) -> Vec<usize> {
        let stop = self.stop.unwrap_or(total).min(total);
        (self.start..stop).step_by(self.stride.max(1)).collect()
    }
}
