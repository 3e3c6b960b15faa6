use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};

/// Square crop window inside a frame, in pixel coordinates.
///
/// Rows cover `row0..row0 + size`, columns cover `col0..col0 + size`, where
/// `size = 2 * fftsize`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub row0: usize,
    pub col0: usize,
    pub fftsize: usize,
}

impl Extent {
    /// Window of side `2 * fftsize` centered on `(row, col)`.
    pub fn centered(center: (usize, usize), fftsize: usize) -> Result<Self> {
        let (row, col) = center;
        if row < fftsize || col < fftsize {
            return Err(DriftError::DimensionMismatch(format!(
                "window of half-size {} around ({}, {}) starts before the frame origin",
                fftsize, row, col
            )));
        }
        Ok(Self {
            row0: row - fftsize,
            col0: col - fftsize,
            fftsize,
        })
    }

    /// Window from explicit bounds `(row_start, row_end, col_start, col_end)`.
    ///
    /// The window is squared up to the larger side, keeping the start corner.
    pub fn from_bounds(bounds: (usize, usize, usize, usize)) -> Result<Self> {
        let (r0, r1, c0, c1) = bounds;
        if r1 <= r0 || c1 <= c0 {
            return Err(DriftError::DimensionMismatch(format!(
                "empty extent rows {}..{} cols {}..{}",
                r0, r1, c0, c1
            )));
        }
        let fftsize = (r1 - r0).max(c1 - c0) / 2;
        if fftsize == 0 {
            return Err(DriftError::DimensionMismatch(
                "extent must be at least 2 pixels wide".into(),
            ));
        }
        Ok(Self {
            row0: r0,
            col0: c0,
            fftsize,
        })
    }

    /// Side length of the square window.
    pub fn size(&self) -> usize {
        2 * self.fftsize
    }

    /// Ensure the window lies within a `height` x `width` frame.
    pub fn check_bounds(&self, height: usize, width: usize) -> Result<()> {
        let size = self.size();
        if self.row0 + size > height || self.col0 + size > width {
            return Err(DriftError::DimensionMismatch(format!(
                "window rows {}..{} cols {}..{} exceeds {}x{} frame",
                self.row0,
                self.row0 + size,
                self.col0,
                self.col0 + size,
                width,
                height
            )));
        }
        Ok(())
    }
}
