use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Integer location and height of the maximum of a correlation surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Peak correlation of one frame pair.
///
/// `dy`/`dx` is the shift that, applied to the second frame of the pair,
/// aligns it with the first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PairEstimate {
    pub weight: f64,
    pub dy: f64,
    pub dx: f64,
}

impl PairEstimate {
    /// Estimate for a pair that cannot be correlated.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The same measurement seen from the other frame of the pair.
    pub fn reversed(&self) -> Self {
        Self {
            weight: self.weight,
            dy: -self.dy,
            dx: -self.dx,
        }
    }
}

/// Locate the maximum of `surface`, whose center element `(h/2, w/2)` is the
/// zero offset.
///
/// Ties are broken towards the smallest distance from the center, then
/// towards the first element in row-major order. Non-finite values are
/// ignored; a surface without any finite value reports the center with a
/// value of zero.
pub fn find_peak(surface: &Array2<f64>) -> Peak {
    let (h, w) = surface.dim();
    let (cy, cx) = ((h / 2) as i64, (w / 2) as i64);
    let dist2 = |r: usize, c: usize| {
        let dy = r as i64 - cy;
        let dx = c as i64 - cx;
        dy * dy + dx * dx
    };

    let mut best: Option<(Peak, i64)> = None;
    for ((row, col), &value) in surface.indexed_iter() {
        if !value.is_finite() {
            continue;
        }
        let d = dist2(row, col);
        let better = match &best {
            None => true,
            Some((peak, best_d)) => value > peak.value || (value == peak.value && d < *best_d),
        };
        if better {
            best = Some((Peak { row, col, value }, d));
        }
    }

    match best {
        Some((peak, _)) => peak,
        None => Peak {
            row: h / 2,
            col: w / 2,
            value: 0.0,
        },
    }
}

/// Refine a peak location with a 1-D parabola fit along each axis.
///
/// Returns (delta_row, delta_col) as fractional pixel offsets from the integer
/// peak, clamped to +/- 0.5. Peaks on the surface border are not refined.
pub fn refine_peak_parabolic(surface: &Array2<f64>, peak: &Peak) -> (f64, f64) {
    let (h, w) = surface.dim();
    let (r, c) = (peak.row, peak.col);

    if r == 0 || r + 1 >= h || c == 0 || c + 1 >= w {
        return (0.0, 0.0);
    }

    let vertex = |prev: f64, curr: f64, next: f64| {
        let curvature = prev - 2.0 * curr + next;
        if curvature.abs() > 1e-12 {
            ((prev - next) / (2.0 * curvature)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };

    let delta_row = vertex(surface[[r - 1, c]], surface[[r, c]], surface[[r + 1, c]]);
    let delta_col = vertex(surface[[r, c - 1]], surface[[r, c]], surface[[r, c + 1]]);
    (delta_row, delta_col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_maximum() {
        let mut s = Array2::<f64>::zeros((8, 8));
        s[[2, 6]] = 0.9;
        let p = find_peak(&s);
        assert_eq!((p.row, p.col), (2, 6));
        assert_eq!(p.value, 0.9);
    }

    #[test]
    fn test_tie_prefers_offset_closest_to_center() {
        let mut s = Array2::<f64>::zeros((8, 8));
        s[[0, 0]] = 1.0;
        s[[5, 4]] = 1.0;
        s[[4, 7]] = 1.0;
        let p = find_peak(&s);
        assert_eq!((p.row, p.col), (5, 4));
    }

    #[test]
    fn test_equal_distance_tie_is_row_major_first() {
        let mut s = Array2::<f64>::zeros((8, 8));
        s[[4, 5]] = 1.0;
        s[[3, 4]] = 1.0;
        let p = find_peak(&s);
        assert_eq!((p.row, p.col), (3, 4));
    }

    #[test]
    fn test_nan_is_ignored() {
        let mut s = Array2::<f64>::from_elem((4, 4), -1.0);
        s[[0, 0]] = f64::NAN;
        s[[1, 3]] = 0.5;
        let p = find_peak(&s);
        assert_eq!((p.row, p.col), (1, 3));

        let all_nan = Array2::<f64>::from_elem((4, 4), f64::NAN);
        let p = find_peak(&all_nan);
        assert_eq!((p.row, p.col, p.value), (2, 2, 0.0));
    }

    #[test]
    fn test_parabolic_refinement_of_symmetric_peak() {
        let mut s = Array2::<f64>::zeros((5, 5));
        s[[2, 2]] = 1.0;
        s[[1, 2]] = 0.5;
        s[[3, 2]] = 0.5;
        s[[2, 1]] = 0.2;
        s[[2, 3]] = 0.6;
        let peak = find_peak(&s);
        let (dr, dc) = refine_peak_parabolic(&s, &peak);
        assert!(dr.abs() < 1e-12);
        assert!(dc > 0.0 && dc <= 0.5);
    }

    #[test]
    fn test_reversed_negates_offset() {
        let e = PairEstimate {
            weight: 0.7,
            dy: 1.5,
            dx: -2.0,
        };
        let r = e.reversed();
        assert_eq!(r.weight, 0.7);
        assert_eq!((r.dy, r.dx), (-1.5, 2.0));
    }
}
