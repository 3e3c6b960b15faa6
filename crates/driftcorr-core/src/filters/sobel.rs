use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Compute the Sobel gradient magnitude image.
///
/// Sobel kernels:
///   Gx = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]]
///   Gy = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]]
///
/// Returns `sqrt((Gx^2 + Gy^2) / 2)` so a unit step gives a response of the
/// same order as the step. The 1-pixel border is zero.
pub fn sobel_magnitude(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut result = Array2::<f32>::zeros((h, w));

    if h < 3 || w < 3 {
        return result;
    }

    let at = |r: usize, c: usize| data[[r, c]] as f64;
    let magnitude = |row: usize, col: usize| -> f32 {
        let gx = -at(row - 1, col - 1) + at(row - 1, col + 1) - 2.0 * at(row, col - 1)
            + 2.0 * at(row, col + 1)
            - at(row + 1, col - 1)
            + at(row + 1, col + 1);

        let gy = -at(row - 1, col - 1) - 2.0 * at(row - 1, col) - at(row - 1, col + 1)
            + at(row + 1, col - 1)
            + 2.0 * at(row + 1, col)
            + at(row + 1, col + 1);

        ((gx * gx + gy * gy) / 2.0).sqrt() as f32
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        result
            .axis_iter_mut(ndarray::Axis(0))
            .into_par_iter()
            .enumerate()
            .filter(|(row, _)| *row >= 1 && *row < h - 1)
            .for_each(|(row, mut out)| {
                for col in 1..w - 1 {
                    out[col] = magnitude(row, col);
                }
            });
    } else {
        for row in 1..h - 1 {
            for col in 1..w - 1 {
                result[[row, col]] = magnitude(row, col);
            }
        }
    }

    result
}
