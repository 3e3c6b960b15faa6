use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

/// Planned forward and inverse 2-D transforms for a fixed array shape.
///
/// Plans are shared behind `Arc`, so one instance can serve every worker.
#[derive(Clone)]
pub struct Fft2d {
    height: usize,
    width: usize,
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    pub fn new(height: usize, width: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            height,
            width,
            row_forward: planner.plan_fft_forward(width),
            col_forward: planner.plan_fft_forward(height),
            row_inverse: planner.plan_fft_inverse(width),
            col_inverse: planner.plan_fft_inverse(height),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// 2D FFT: row-wise FFT, then column-wise FFT.
    pub fn forward(&self, data: &Array2<f64>) -> Array2<Complex<f64>> {
        debug_assert_eq!(data.dim(), self.dim());
        let mut work = data.mapv(|v| Complex::new(v, 0.0));
        transform_rows(&mut work, self.row_forward.as_ref());
        transform_cols(&mut work, self.col_forward.as_ref());
        work
    }

    /// Inverse 2D FFT, keeping the real part, normalized by the element count.
    pub fn inverse_real(&self, spectrum: Array2<Complex<f64>>) -> Array2<f64> {
        debug_assert_eq!(spectrum.dim(), self.dim());
        let mut work = spectrum;
        transform_cols(&mut work, self.col_inverse.as_ref());
        transform_rows(&mut work, self.row_inverse.as_ref());

        let scale = 1.0 / (self.height * self.width) as f64;
        work.mapv(|c| c.re * scale)
    }
}

fn transform_rows(work: &mut Array2<Complex<f64>>, fft: &dyn Fft<f64>) {
    let w = work.ncols();
    let mut buf = vec![Complex::<f64>::zero(); w];
    for mut row in work.rows_mut() {
        for (b, v) in buf.iter_mut().zip(row.iter()) {
            *b = *v;
        }
        fft.process(&mut buf);
        for (v, b) in row.iter_mut().zip(buf.iter()) {
            *v = *b;
        }
    }
}

fn transform_cols(work: &mut Array2<Complex<f64>>, fft: &dyn Fft<f64>) {
    let h = work.nrows();
    let mut buf = vec![Complex::<f64>::zero(); h];
    for mut col in work.columns_mut() {
        for (b, v) in buf.iter_mut().zip(col.iter()) {
            *b = *v;
        }
        fft.process(&mut buf);
        for (v, b) in col.iter_mut().zip(buf.iter()) {
            *v = *b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_restores_input() {
        let data = Array2::from_shape_fn((6, 8), |(r, c)| (r * 8 + c) as f64 * 0.25 - 3.0);
        let fft = Fft2d::new(6, 8);
        let back = fft.inverse_real(fft.forward(&data));
        for (a, b) in data.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_dc_term_is_sum() {
        let data = Array2::from_elem((4, 4), 2.0);
        let spectrum = Fft2d::new(4, 4).forward(&data);
        assert!((spectrum[[0, 0]].re - 32.0).abs() < 1e-12);
        assert!(spectrum[[1, 2]].norm() < 1e-12);
    }
}
