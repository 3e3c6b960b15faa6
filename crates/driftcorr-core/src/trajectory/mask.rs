use ndarray::{Array2, Axis};
use tracing::debug;

use crate::error::{DriftError, Result};

use super::matrices::HalfMatrices;

/// Pairs that pass the confidence threshold, restricted to the frames that
/// keep at least one such pair.
#[derive(Clone, Debug)]
pub struct MaskedPairs {
    /// Stack indices of the surviving frames, increasing.
    pub coords: Vec<usize>,
    /// Per sampled position: does the frame survive?
    pub row_mask: Vec<bool>,
    /// Per sampled pair: does the pair survive? Diagonal is always false.
    pub pair_mask: Array2<bool>,
    /// Normalized weights between surviving frames, zero where masked.
    pub weights: Array2<f64>,
    pub dx: Array2<f64>,
    pub dy: Array2<f64>,
}

impl MaskedPairs {
    /// Number of surviving unordered pairs.
    pub fn surviving_pairs(&self) -> usize {
        self.pair_mask.iter().filter(|&&m| m).count() / 2
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Surviving pairs `(i, j)`, `i < j`, in reduced positions.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.coords.len();
        (0..n).flat_map(move |i| {
            (i + 1..n)
                .filter(move |&j| self.weights[[i, j]] > 0.0)
                .map(move |j| (i, j))
        })
    }
}

/// Keep pairs whose normalized weight reaches `min_normed_weight` and drop
/// frames left without any pair. Pairs with a non-positive weight carry no
/// information and never survive, whatever the threshold.
///
/// Non-finite weights anywhere, or non-finite shifts on a kept pair, are
/// reported with the stack indices of the offending pair.
pub fn threshold_and_mask(half: &HalfMatrices, min_normed_weight: f64) -> Result<MaskedPairs> {
    let n = half.len();
    let wn = half.normalized_weights();

    for ((i, j), &v) in wn.indexed_iter() {
        if !v.is_finite() {
            return Err(DriftError::NonFinite {
                quantity: "weight",
                i: half.nr[i],
                j: half.nr[j],
            });
        }
    }

    let pair_mask = Array2::from_shape_fn((n, n), |(i, j)| {
        let v = wn[[i, j]];
        i != j && v > 0.0 && v >= min_normed_weight
    });

    for ((i, j), _) in pair_mask.indexed_iter().filter(|(_, m)| **m) {
        for (quantity, m) in [("dx", &half.dx), ("dy", &half.dy)] {
            if !m[[i, j]].is_finite() {
                return Err(DriftError::NonFinite {
                    quantity,
                    i: half.nr[i],
                    j: half.nr[j],
                });
            }
        }
    }

    let row_mask: Vec<bool> = pair_mask
        .axis_iter(Axis(0))
        .map(|row| row.iter().any(|&m| m))
        .collect();
    let keep: Vec<usize> = (0..n).filter(|&i| row_mask[i]).collect();
    let coords: Vec<usize> = keep.iter().map(|&i| half.nr[i]).collect();

    let m = keep.len();
    let reduce = |src: &Array2<f64>| {
        Array2::from_shape_fn((m, m), |(a, b)| {
            let (i, j) = (keep[a], keep[b]);
            if pair_mask[[i, j]] {
                src[[i, j]]
            } else {
                0.0
            }
        })
    };
    let weights = reduce(&wn);
    let dx = reduce(&half.dx);
    let dy = reduce(&half.dy);

    debug!(
        sampled = n,
        surviving = m,
        min_normed_weight,
        "Masked low-confidence pairs"
    );

    Ok(MaskedPairs {
        coords,
        row_mask,
        pair_mask,
        weights,
        dx,
        dy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::{PairEstimate, PairResult};

    fn half(weights: &[(usize, usize, f64)], n: usize) -> HalfMatrices {
        let mut pairs: Vec<PairResult> = (0..n)
            .map(|i| PairResult {
                i,
                j: i,
                estimate: PairEstimate {
                    weight: 1.0,
                    dy: 0.0,
                    dx: 0.0,
                },
            })
            .collect();
        for &(i, j, weight) in weights {
            pairs.push(PairResult {
                i,
                j,
                estimate: PairEstimate {
                    weight,
                    dy: 1.0,
                    dx: -1.0,
                },
            });
        }
        HalfMatrices::from_pairs((0..n).map(|i| i * 10).collect(), &pairs).unwrap()
    }

    #[test]
    fn test_rows_without_pairs_are_dropped() {
        let h = half(&[(0, 1, 0.9), (1, 2, 0.1), (0, 2, 0.05)], 3);
        let m = threshold_and_mask(&h, 0.5).unwrap();
        assert_eq!(m.coords, vec![0, 10]);
        assert_eq!(m.row_mask, vec![true, true, false]);
        assert_eq!(m.surviving_pairs(), 1);
        assert_eq!(m.pairs().collect::<Vec<_>>(), vec![(0, 1)]);
        assert_eq!(m.dx[[0, 1]], -1.0);
        assert_eq!(m.dx[[1, 0]], 1.0);
    }

    #[test]
    fn test_zero_weight_never_survives() {
        let h = half(&[(0, 1, 0.0), (1, 2, 0.4)], 3);
        let m = threshold_and_mask(&h, 0.0).unwrap();
        assert_eq!(m.coords, vec![10, 20]);
    }

    #[test]
    fn test_nan_weight_reported_with_stack_indices() {
        let h = half(&[(1, 2, f64::NAN)], 3);
        match threshold_and_mask(&h, 0.1) {
            Err(DriftError::NonFinite { quantity, i, j }) => {
                assert_eq!(quantity, "weight");
                assert_eq!((i.min(j), i.max(j)), (10, 20));
            }
            other => panic!("expected NonFinite, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_shift_on_surviving_pair_reported() {
        let mut h = half(&[(0, 1, 0.8)], 2);
        h.dy[[0, 1]] = f64::INFINITY;
        assert!(matches!(
            threshold_and_mask(&h, 0.5),
            Err(DriftError::NonFinite { quantity: "dy", .. })
        ));
    }
}
