//! Sub-pixel shifting of full-resolution frames onto a padded canvas.

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{s, Array2};
use rayon::prelude::*;
use tracing::info;

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{DriftError, Result};
use crate::frame::{Frame, FrameStack, Shift, StackInfo};
use crate::trajectory::DenseShifts;

/// Drift-corrected frames with the shifts that produced them.
#[derive(Clone, Debug)]
pub struct CorrectedStack {
    pub frames: Vec<Frame>,
    pub shifts: DenseShifts,
    /// Zero padding added on the high-index side as (rows, cols).
    pub margins: (usize, usize),
    pub info: StackInfo,
    /// Provenance flag carried to the writers.
    pub drift_corrected: bool,
}

impl CorrectedStack {
    /// Frame shape as (height, width), including the margins.
    pub fn dim(&self) -> (usize, usize) {
        self.frames
            .first()
            .map(|f| f.data.dim())
            .unwrap_or((0, 0))
    }
}

/// Padding per axis (rows, cols) so that the largest positive shift stays on
/// the canvas.
pub fn needed_margins(shifts: &DenseShifts) -> (usize, usize) {
    let (my, mx) = shifts.max_positive();
    (my.ceil() as usize, mx.ceil() as usize)
}

/// Zero-pad `data` on the high-index side of each axis.
pub fn pad_array(data: &Array2<f32>, margins: (usize, usize)) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut padded = Array2::<f32>::zeros((h + margins.0, w + margins.1));
    padded.slice_mut(s![..h, ..w]).assign(data);
    padded
}

/// Move the content of `data` by `shift` with bilinear interpolation.
/// Samples that fall outside the source are zero.
pub fn shift_array(data: &Array2<f32>, shift: &Shift) -> Array2<f32> {
    if shift.is_zero() {
        return data.clone();
    }
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        bilinear_sample(data, row as f64 - shift.dy, col as f64 - shift.dx)
    })
}

pub fn bilinear_sample(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |r: i64, c: i64| -> f32 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    let v00 = sample(y0, x0);
    let v10 = sample(y0, x1);
    let v01 = sample(y1, x0);
    let v11 = sample(y1, x1);

    v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy
}

/// Pad a frame by `margins` and shift it, keeping bit depth and metadata.
pub fn shift_frame(frame: &Frame, shift: &Shift, margins: (usize, usize)) -> Frame {
    let padded = pad_array(&frame.data, margins);
    Frame {
        data: shift_array(&padded, shift),
        original_bit_depth: frame.original_bit_depth,
        metadata: frame.metadata.clone(),
    }
}

/// Apply one shift per frame to the whole stack.
pub fn apply_shifts(
    stack: &FrameStack,
    shifts: &DenseShifts,
    on_frame_done: impl Fn(usize) + Send + Sync,
) -> Result<CorrectedStack> {
    if shifts.len() != stack.len() {
        return Err(DriftError::DimensionMismatch(format!(
            "{} shifts for {} frames",
            shifts.len(),
            stack.len()
        )));
    }
    if let Some(k) = shifts
        .shifts
        .iter()
        .position(|s| !(s.dx.is_finite() && s.dy.is_finite()))
    {
        return Err(DriftError::NonFinite {
            quantity: "shift",
            i: k,
            j: k,
        });
    }

    let margins = needed_margins(shifts);
    info!(
        frames = stack.len(),
        margin_rows = margins.0,
        margin_cols = margins.1,
        "Shifting frames"
    );

    let counter = AtomicUsize::new(0);
    let work = |(frame, shift): (&Frame, &Shift)| {
        let shifted = shift_frame(frame, shift, margins);
        on_frame_done(counter.fetch_add(1, Ordering::Relaxed) + 1);
        shifted
    };

    let frames: Vec<Frame> = if stack.len() >= PARALLEL_FRAME_THRESHOLD {
        stack
            .frames()
            .par_iter()
            .zip(shifts.shifts.par_iter())
            .map(work)
            .collect()
    } else {
        stack.frames().iter().zip(shifts.shifts.iter()).map(work).collect()
    };

    Ok(CorrectedStack {
        frames,
        shifts: shifts.clone(),
        margins,
        info: stack.info.clone(),
        drift_corrected: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilinear_interpolation() {
        let mut data = Array2::<f32>::zeros((4, 4));
        data[[1, 1]] = 1.0;

        assert!((bilinear_sample(&data, 1.0, 1.0) - 1.0).abs() < 1e-6);
        assert!((bilinear_sample(&data, 1.0, 1.5) - 0.5).abs() < 1e-6);
        assert_eq!(bilinear_sample(&data, -2.0, 1.0), 0.0);
    }

    #[test]
    fn test_integer_shift_moves_content() {
        let mut data = Array2::<f32>::zeros((5, 5));
        data[[1, 2]] = 1.0;
        let out = shift_array(&data, &Shift::new(2.0, -1.0));
        assert!((out[[3, 1]] - 1.0).abs() < 1e-6);
        assert!(out[[1, 2]].abs() < 1e-6);
    }

    #[test]
    fn test_margins_round_up_positive_shifts() {
        let shifts = DenseShifts {
            shifts: vec![Shift::new(0.2, -4.0), Shift::new(-1.0, 2.0), Shift::new(1.0, 0.0)],
        };
        assert_eq!(needed_margins(&shifts), (1, 2));
        assert_eq!(needed_margins(&DenseShifts::zeros(3)), (0, 0));
    }

    #[test]
    fn test_pad_keeps_origin_content() {
        let data = Array2::<f32>::from_elem((2, 3), 0.5);
        let padded = pad_array(&data, (1, 2));
        assert_eq!(padded.dim(), (3, 5));
        assert_eq!(padded[[1, 2]], 0.5);
        assert_eq!(padded[[2, 4]], 0.0);
    }
}
