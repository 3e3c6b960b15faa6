use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DriftError, Result};

use super::mask::MaskedPairs;

/// Absolute shifts of the surviving sampled frames.
///
/// Shifts are only defined up to a common offset; the solution with zero
/// mean on each axis is returned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShiftTrajectory {
    /// Stack indices, increasing.
    pub coords: Vec<usize>,
    pub dx: Vec<f64>,
    pub dy: Vec<f64>,
    /// Weighted RMS of the pair residuals `s[j] - s[i] - d[i,j]`.
    pub residual_dx: f64,
    pub residual_dy: f64,
}

/// Label each of `n` nodes with its connected component over `edges`.
///
/// Returns the labels (smallest node index of the component) and the number
/// of components.
pub fn connected_components(
    n: usize,
    edges: impl IntoIterator<Item = (usize, usize)>,
) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..n).collect();

    fn root(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for (a, b) in edges {
        let ra = root(&mut parent, a);
        let rb = root(&mut parent, b);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent[hi] = lo;
        }
    }

    let labels: Vec<usize> = (0..n).map(|x| root(&mut parent, x)).collect();
    let count = labels.iter().enumerate().filter(|(i, l)| *i == **l).count();
    (labels, count)
}

/// Reduce the masked pairwise shift matrices to one absolute shift per
/// surviving frame by weighted least squares.
///
/// Each kept pair contributes the equation `s[j] - s[i] = d[i,j]`, scaled by
/// its normalized weight raised to `weight_power`. Fewer than two frames or
/// a pair graph that falls apart into several groups cannot be solved.
pub fn calc_shift_vectors(masked: &MaskedPairs, weight_power: f64) -> Result<ShiftTrajectory> {
    let n = masked.len();
    let pairs: Vec<(usize, usize)> = masked.pairs().collect();
    let (_, components) = connected_components(n, pairs.iter().copied());

    if n < 2 || components != 1 {
        return Err(DriftError::InsufficientOverlap {
            surviving: n,
            components,
        });
    }

    // Squared row scale of each equation.
    let omega: Vec<f64> = pairs
        .iter()
        .map(|&(i, j)| masked.weights[[i, j]].powf(2.0 * weight_power))
        .collect();

    let mut laplacian = DMatrix::<f64>::zeros(n, n);
    for (&(i, j), &w) in pairs.iter().zip(&omega) {
        laplacian[(i, i)] += w;
        laplacian[(j, j)] += w;
        laplacian[(i, j)] -= w;
        laplacian[(j, i)] -= w;
    }

    // Adding a multiple of the all-ones matrix pins the free offset to a
    // zero mean without changing the least-squares solution.
    let scale = laplacian.diagonal().mean() / n as f64;
    let mut system = laplacian;
    system.add_scalar_mut(scale);

    let cholesky = system.cholesky().ok_or_else(|| {
        DriftError::Solver(format!(
            "normal equations for {} frames are not positive definite",
            n
        ))
    })?;

    let solve_axis = |d: &Array2<f64>| -> (Vec<f64>, f64) {
        let mut rhs = DVector::<f64>::zeros(n);
        for (&(i, j), &w) in pairs.iter().zip(&omega) {
            rhs[j] += w * d[[i, j]];
            rhs[i] -= w * d[[i, j]];
        }
        let s = cholesky.solve(&rhs);

        let mut weighted = 0.0;
        let mut total = 0.0;
        for (&(i, j), &w) in pairs.iter().zip(&omega) {
            let r = s[j] - s[i] - d[[i, j]];
            weighted += w * r * r;
            total += w;
        }
        let rms = if total > 0.0 {
            (weighted / total).sqrt()
        } else {
            0.0
        };
        (s.iter().copied().collect(), rms)
    };

    let (dx, residual_dx) = solve_axis(&masked.dx);
    let (dy, residual_dy) = solve_axis(&masked.dy);

    if let Some(k) = dx.iter().chain(dy.iter()).position(|v| !v.is_finite()) {
        let idx = masked.coords[k % n];
        return Err(DriftError::NonFinite {
            quantity: "shift",
            i: idx,
            j: idx,
        });
    }

    info!(
        frames = n,
        pairs = pairs.len(),
        residual_dx,
        residual_dy,
        "Solved shift trajectory"
    );

    Ok(ShiftTrajectory {
        coords: masked.coords.clone(),
        dx,
        dy,
        residual_dx,
        residual_dy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_of_two_groups() {
        let (labels, count) = connected_components(5, [(0, 1), (3, 4), (1, 0)]);
        assert_eq!(count, 3);
        assert_eq!(labels, vec![0, 0, 2, 3, 3]);
    }

    #[test]
    fn test_single_component() {
        let (_, count) = connected_components(4, [(2, 3), (0, 2), (1, 3)]);
        assert_eq!(count, 1);
    }
}
