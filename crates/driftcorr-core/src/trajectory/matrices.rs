use ndarray::Array2;

use crate::correlate::PairResult;
use crate::error::{DriftError, Result};

/// Pairwise weights and relative shifts between the sampled frames.
///
/// `w` is symmetric and `dx`/`dy` antisymmetric: entry `(i, j)` is the shift
/// that aligns frame `nr[j]` with frame `nr[i]`. The diagonal of `w` holds
/// each frame's self-correlation peak.
#[derive(Clone, Debug)]
pub struct HalfMatrices {
    /// Stack index of each sampled position.
    pub nr: Vec<usize>,
    pub w: Array2<f64>,
    pub dx: Array2<f64>,
    pub dy: Array2<f64>,
}

impl HalfMatrices {
    /// Scatter upper-triangle pair results into full matrices.
    pub fn from_pairs(nr: Vec<usize>, pairs: &[PairResult]) -> Result<Self> {
        let n = nr.len();
        let mut w = Array2::<f64>::zeros((n, n));
        let mut dx = Array2::<f64>::zeros((n, n));
        let mut dy = Array2::<f64>::zeros((n, n));

        for pair in pairs {
            let (i, j) = (pair.i, pair.j);
            if i >= n || j >= n {
                return Err(DriftError::DimensionMismatch(format!(
                    "pair ({}, {}) outside {} sampled frames",
                    i, j, n
                )));
            }
            let e = &pair.estimate;
            w[[i, j]] = e.weight;
            w[[j, i]] = e.weight;
            if i != j {
                let r = e.reversed();
                dx[[i, j]] = e.dx;
                dy[[i, j]] = e.dy;
                dx[[j, i]] = r.dx;
                dy[[j, i]] = r.dy;
            }
        }

        Ok(Self { nr, w, dx, dy })
    }

    pub fn len(&self) -> usize {
        self.nr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nr.is_empty()
    }

    /// Weights divided by the geometric mean of the two self-correlations.
    ///
    /// The diagonal is exactly 1. Pairs involving a frame without positive
    /// self-correlation get weight 0.
    pub fn normalized_weights(&self) -> Array2<f64> {
        let n = self.len();
        let diag: Vec<f64> = (0..n).map(|i| self.w[[i, i]]).collect();
        Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                1.0
            } else if diag[i] > 0.0 && diag[j] > 0.0 {
                self.w[[i, j]] / (diag[i] * diag[j]).sqrt()
            } else {
                0.0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::PairEstimate;

    fn pair(i: usize, j: usize, weight: f64, dy: f64, dx: f64) -> PairResult {
        PairResult {
            i,
            j,
            estimate: PairEstimate { weight, dy, dx },
        }
    }

    #[test]
    fn test_scatter_is_antisymmetric() {
        let pairs = vec![
            pair(0, 0, 4.0, 0.0, 0.0),
            pair(1, 1, 1.0, 0.0, 0.0),
            pair(0, 1, 1.0, 2.0, -3.0),
        ];
        let m = HalfMatrices::from_pairs(vec![0, 5], &pairs).unwrap();
        assert_eq!(m.w[[1, 0]], 1.0);
        assert_eq!(m.dx[[0, 1]], -3.0);
        assert_eq!(m.dx[[1, 0]], 3.0);
        assert_eq!(m.dy[[1, 0]], -2.0);

        let wn = m.normalized_weights();
        assert_eq!(wn[[0, 0]], 1.0);
        assert_eq!(wn[[1, 1]], 1.0);
        assert!((wn[[0, 1]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_self_weight_normalizes_to_zero() {
        let pairs = vec![pair(0, 0, 1.0, 0.0, 0.0), pair(0, 1, 0.0, 0.0, 0.0)];
        let m = HalfMatrices::from_pairs(vec![0, 1], &pairs).unwrap();
        let wn = m.normalized_weights();
        assert_eq!(wn[[0, 1]], 0.0);
        assert_eq!(wn[[1, 1]], 1.0);
    }

    #[test]
    fn test_out_of_range_pair_rejected() {
        let pairs = vec![pair(0, 2, 1.0, 0.0, 0.0)];
        assert!(HalfMatrices::from_pairs(vec![0, 1], &pairs).is_err());
    }
}
