use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::DEFAULT_UPSAMPLE_FACTOR;
use crate::error::{DriftError, Result};
use crate::pipeline::config::PeakRefinement;
use crate::preprocess::FilteredFrame;

use super::fft::Fft2d;
use super::peak::{find_peak, refine_peak_parabolic, PairEstimate};
use super::upsample::refine_peak_upsampled;

/// Forward transform of one filtered frame.
pub struct Spectrum {
    /// Position of the frame in the sampled sequence.
    pub position: usize,
    pub data: Array2<Complex<f64>>,
    pub norm: f64,
    pub degenerate: bool,
}

/// Square tile of the pair index space: rows `rows.0..rows.1` against
/// columns `cols.0..cols.1`. Only pairs with `i <= j` are evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairBlock {
    pub rows: (usize, usize),
    pub cols: (usize, usize),
}

impl PairBlock {
    /// Upper-triangle pairs covered by this block.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.rows.0..self.rows.1)
            .flat_map(move |i| (self.cols.0.max(i)..self.cols.1).map(move |j| (i, j)))
    }
}

/// Peak estimate for pair `(i, j)` of sampled positions, `i <= j`.
#[derive(Clone, Copy, Debug)]
pub struct PairResult {
    pub i: usize,
    pub j: usize,
    pub estimate: PairEstimate,
}

/// Normalized FFT cross-correlation over all pairs of filtered frames.
pub struct PairwiseCorrelator {
    fft: Fft2d,
    size: usize,
    window: usize,
    block_size: usize,
    refinement: PeakRefinement,
    upsample_factor: usize,
}

impl PairwiseCorrelator {
    /// `fftsize` is half the side of the filtered frames, `window` the largest
    /// offset searched for a peak.
    pub fn new(
        fftsize: usize,
        window: usize,
        block_size: usize,
        refinement: PeakRefinement,
    ) -> Result<Self> {
        if window == 0 || window > fftsize {
            return Err(DriftError::InvalidConfig(format!(
                "correlation window {} must be in 1..={}",
                window, fftsize
            )));
        }
        if block_size == 0 {
            return Err(DriftError::InvalidConfig("block_size must be >= 1".into()));
        }
        let size = 2 * fftsize;
        Ok(Self {
            fft: Fft2d::new(size, size),
            size,
            window,
            block_size,
            refinement,
            upsample_factor: DEFAULT_UPSAMPLE_FACTOR,
        })
    }

    /// Grid density of [`PeakRefinement::Upsampled`]; ignored by the other
    /// refinements.
    pub fn with_upsample_factor(mut self, factor: usize) -> Self {
        self.upsample_factor = factor.max(1);
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn spectrum(&self, position: usize, frame: &FilteredFrame) -> Result<Spectrum> {
        if frame.data.dim() != (self.size, self.size) {
            let (h, w) = frame.data.dim();
            return Err(DriftError::DimensionMismatch(format!(
                "filtered frame {} is {}x{}, correlator expects {}x{}",
                frame.index, w, h, self.size, self.size
            )));
        }
        let degenerate = frame.is_degenerate();
        let data = if degenerate {
            Array2::zeros((self.size, self.size))
        } else {
            self.fft.forward(&frame.data)
        };
        Ok(Spectrum {
            position,
            data,
            norm: frame.norm,
            degenerate,
        })
    }

    /// Normalized correlation of `b` against `a` for offsets in
    /// `[-window, window)` on both axes; element `(window, window)` is zero
    /// offset. Returns `None` if either frame is degenerate.
    ///
    /// The value at offset `d` is `sum_x b(x) * a(x + d) / (|a| |b|)`, so the
    /// peak sits at the shift that moves `b` onto `a`.
    pub fn surface(&self, a: &Spectrum, b: &Spectrum) -> Option<Array2<f64>> {
        if a.degenerate || b.degenerate {
            return None;
        }
        Some(self.surface_of(cross_power(a, b), a, b))
    }

    fn surface_of(
        &self,
        product: Array2<Complex<f64>>,
        a: &Spectrum,
        b: &Spectrum,
    ) -> Array2<f64> {
        let circular = self.fft.inverse_real(product);

        let n = self.size as isize;
        let win = self.window as isize;
        let scale = 1.0 / (a.norm * b.norm);
        let side = 2 * self.window;
        Array2::from_shape_fn((side, side), |(r, c)| {
            let src_r = (r as isize - win).rem_euclid(n) as usize;
            let src_c = (c as isize - win).rem_euclid(n) as usize;
            circular[[src_r, src_c]] * scale
        })
    }

    /// Correlate one pair and reduce the surface to its peak.
    ///
    /// The weight is always the integer peak height; only the offset is
    /// refined.
    pub fn estimate_pair(&self, a: &Spectrum, b: &Spectrum) -> PairEstimate {
        if a.degenerate || b.degenerate {
            return PairEstimate::zero();
        }
        let product = cross_power(a, b);
        let surface = self.surface_of(product.clone(), a, b);

        let peak = find_peak(&surface);
        let dy = peak.row as f64 - self.window as f64;
        let dx = peak.col as f64 - self.window as f64;
        let (dy, dx) = match self.refinement {
            PeakRefinement::None => (dy, dx),
            PeakRefinement::Parabolic => {
                let (sub_row, sub_col) = refine_peak_parabolic(&surface, &peak);
                (dy + sub_row, dx + sub_col)
            }
            PeakRefinement::Upsampled => {
                refine_peak_upsampled(&product, dy, dx, self.upsample_factor)
            }
        };

        PairEstimate {
            weight: peak.value,
            dy,
            dx,
        }
    }

    /// Tiles of the upper triangle of an `n` x `n` pair matrix.
    pub fn blocks(&self, n: usize) -> Vec<PairBlock> {
        let starts: Vec<usize> = (0..n).step_by(self.block_size).collect();
        let mut blocks = Vec::new();
        for (bi, &r0) in starts.iter().enumerate() {
            for &c0 in &starts[bi..] {
                blocks.push(PairBlock {
                    rows: (r0, (r0 + self.block_size).min(n)),
                    cols: (c0, (c0 + self.block_size).min(n)),
                });
            }
        }
        blocks
    }

    /// Evaluate one block. Spectra are computed for the frames the block
    /// touches and dropped with it.
    pub fn correlate_block(
        &self,
        frames: &[FilteredFrame],
        block: &PairBlock,
    ) -> Result<Vec<PairResult>> {
        let row_spectra = (block.rows.0..block.rows.1)
            .map(|p| self.spectrum(p, &frames[p]))
            .collect::<Result<Vec<_>>>()?;
        let col_spectra = if block.cols == block.rows {
            None
        } else {
            Some(
                (block.cols.0..block.cols.1)
                    .map(|p| self.spectrum(p, &frames[p]))
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        let cols = col_spectra.as_deref().unwrap_or(row_spectra.as_slice());

        let results = block
            .pairs()
            .map(|(i, j)| {
                let a = &row_spectra[i - block.rows.0];
                let b = &cols[j - block.cols.0];
                let estimate = self.estimate_pair(a, b);
                if a.degenerate || b.degenerate {
                    debug!(
                        i = frames[i].index,
                        j = frames[j].index,
                        "Degenerate frame in pair, weight set to zero"
                    );
                }
                PairResult { i, j, estimate }
            })
            .collect();
        Ok(results)
    }

    /// Correlate every pair `i <= j` of `frames`, one parallel task per block.
    ///
    /// `on_block_done` receives the number of finished blocks.
    pub fn correlate_all(
        &self,
        frames: &[FilteredFrame],
        on_block_done: impl Fn(usize) + Send + Sync,
    ) -> Result<Vec<PairResult>> {
        let blocks = self.blocks(frames.len());
        debug!(
            frames = frames.len(),
            blocks = blocks.len(),
            block_size = self.block_size,
            window = self.window,
            "Correlating frame pairs"
        );

        let done = AtomicUsize::new(0);
        let per_block: Vec<Vec<PairResult>> = blocks
            .par_iter()
            .map(|block| {
                let results = self.correlate_block(frames, block)?;
                on_block_done(done.fetch_add(1, Ordering::Relaxed) + 1);
                Ok(results)
            })
            .collect::<Result<_>>()?;

        Ok(per_block.into_iter().flatten().collect())
    }
}

/// `conj(B) * A`; its inverse transform is the circular correlation of `b`
/// against `a`.
fn cross_power(a: &Spectrum, b: &Spectrum) -> Array2<Complex<f64>> {
    let mut product = b.data.mapv(|v| v.conj());
    product.zip_mut_with(&a.data, |p, &v| *p *= v);
    product
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlator(block_size: usize) -> PairwiseCorrelator {
        PairwiseCorrelator::new(8, 8, block_size, PeakRefinement::None).unwrap()
    }

    #[test]
    fn test_blocks_cover_upper_triangle_once() {
        let c = correlator(3);
        let n = 8;
        let mut seen = Array2::<u32>::zeros((n, n));
        for block in c.blocks(n) {
            for (i, j) in block.pairs() {
                seen[[i, j]] += 1;
            }
        }
        for i in 0..n {
            for j in 0..n {
                let expected = if i <= j { 1 } else { 0 };
                assert_eq!(seen[[i, j]], expected, "pair ({i}, {j})");
            }
        }
    }

    #[test]
    fn test_window_larger_than_fftsize_rejected() {
        assert!(PairwiseCorrelator::new(8, 9, 4, PeakRefinement::None).is_err());
        assert!(PairwiseCorrelator::new(8, 8, 0, PeakRefinement::None).is_err());
    }

    #[test]
    fn test_degenerate_pair_has_zero_weight() {
        let c = correlator(2);
        let flat = FilteredFrame {
            index: 0,
            data: Array2::zeros((16, 16)),
            norm: 0.0,
        };
        let s = c.spectrum(0, &flat).unwrap();
        let e = c.estimate_pair(&s, &s);
        assert_eq!(e, PairEstimate::zero());
        assert!(c.surface(&s, &s).is_none());
    }
}
