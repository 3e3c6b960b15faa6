use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};
use crate::frame::Shift;

/// One shift per frame of the full stack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DenseShifts {
    pub shifts: Vec<Shift>,
}

impl DenseShifts {
    pub fn zeros(n: usize) -> Self {
        Self {
            shifts: vec![Shift::default(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Largest positive shift per axis as (rows, cols); zero if none.
    pub fn max_positive(&self) -> (f64, f64) {
        self.shifts.iter().fold((0.0f64, 0.0f64), |(my, mx), s| {
            (my.max(s.dy), mx.max(s.dx))
        })
    }
}

/// Resample shifts known at `coords` to every frame in `0..n_total`.
///
/// Linear between neighbouring coords, exact at the coords themselves, and
/// held at the first/last known value outside `coords[0]..=coords[last]`.
pub fn interpolate_shifts(
    coords: &[usize],
    dx: &[f64],
    dy: &[f64],
    n_total: usize,
) -> Result<DenseShifts> {
    if coords.is_empty() {
        return Err(DriftError::EmptySequence);
    }
    if dx.len() != coords.len() || dy.len() != coords.len() {
        return Err(DriftError::DimensionMismatch(format!(
            "{} coords but {} dx and {} dy values",
            coords.len(),
            dx.len(),
            dy.len()
        )));
    }
    if coords.windows(2).any(|w| w[0] >= w[1]) {
        return Err(DriftError::InvalidConfig(
            "interpolation coords must be strictly increasing".into(),
        ));
    }

    let last = coords.len() - 1;
    let shifts = (0..n_total)
        .map(|k| {
            let idx = coords.partition_point(|&c| c < k);
            if idx == 0 {
                Shift::new(dy[0], dx[0])
            } else if idx > last {
                Shift::new(dy[last], dx[last])
            } else if coords[idx] == k {
                Shift::new(dy[idx], dx[idx])
            } else {
                let (c0, c1) = (coords[idx - 1] as f64, coords[idx] as f64);
                let t = (k as f64 - c0) / (c1 - c0);
                Shift::new(
                    dy[idx - 1] + t * (dy[idx] - dy[idx - 1]),
                    dx[idx - 1] + t * (dx[idx] - dx[idx - 1]),
                )
            }
        })
        .collect();

    Ok(DenseShifts { shifts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_between_coords_and_clamped_outside() {
        let d = interpolate_shifts(&[2, 6], &[1.0, 3.0], &[-2.0, 2.0], 9).unwrap();
        let dx: Vec<f64> = d.shifts.iter().map(|s| s.dx).collect();
        assert_eq!(dx, vec![1.0, 1.0, 1.0, 1.5, 2.0, 2.5, 3.0, 3.0, 3.0]);
        assert_eq!(d.shifts[4].dy, 0.0);
    }

    #[test]
    fn test_single_coord_is_constant() {
        let d = interpolate_shifts(&[3], &[0.25], &[0.5], 5).unwrap();
        assert!(d.shifts.iter().all(|s| s.dx == 0.25 && s.dy == 0.5));
    }

    #[test]
    fn test_unsorted_coords_rejected() {
        assert!(interpolate_shifts(&[3, 3], &[0.0, 1.0], &[0.0, 1.0], 5).is_err());
        assert!(interpolate_shifts(&[], &[], &[], 5).is_err());
    }

    #[test]
    fn test_max_positive_ignores_negative_shifts() {
        let d = DenseShifts {
            shifts: vec![Shift::new(-3.0, 1.2), Shift::new(0.4, -5.0)],
        };
        assert_eq!(d.max_positive(), (0.4, 1.2));
    }
}
