use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::{GAUSSIAN_RADIUS_SIGMAS, PARALLEL_PIXEL_THRESHOLD};

/// Apply Gaussian blur to a raw array using separable 1D convolution.
///
/// Borders are handled by clamping to the nearest edge pixel.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve(data, &kernel, Axis::Rows);
    convolve(&row_pass, &kernel, Axis::Cols)
}

#[derive(Clone, Copy)]
enum Axis {
    /// Convolve along each row (horizontal pass).
    Rows,
    /// Convolve along each column (vertical pass).
    Cols,
}

pub(crate) fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * GAUSSIAN_RADIUS_SIGMAS).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

fn convolve(data: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;

    let pixel = |row: usize, col: usize| -> f32 {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let off = ki as isize - radius;
            let v = match axis {
                Axis::Rows => {
                    let c = (col as isize + off).clamp(0, w as isize - 1) as usize;
                    data[[row, c]]
                }
                Axis::Cols => {
                    let r = (row as isize + off).clamp(0, h as isize - 1) as usize;
                    data[[r, col]]
                }
            };
            sum += v * kv;
        }
        sum
    };

    let mut result = Array2::<f32>::zeros((h, w));
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        result
            .axis_iter_mut(ndarray::Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, mut out)| {
                for col in 0..w {
                    out[col] = pixel(row, col);
                }
            });
    } else {
        for row in 0..h {
            for col in 0..w {
                result[[row, col]] = pixel(row, col);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let k = make_gaussian_kernel(2.0);
        assert_eq!(k.len(), 13);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_constant_image_unchanged() {
        let data = Array2::<f32>::from_elem((20, 30), 0.4);
        let out = gaussian_blur_array(&data, 1.5);
        for &v in out.iter() {
            assert!((v - 0.4).abs() < 1e-5);
        }
    }
}
