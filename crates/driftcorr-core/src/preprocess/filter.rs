use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{s, Array2};
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{DEGENERATE_NORM_EPSILON, GAUSSIAN_RADIUS_SIGMAS};
use crate::error::Result;
use crate::filters::{gaussian_blur_array, sobel_magnitude};
use crate::frame::FrameStack;

use super::Extent;

/// Edge-filtered, zero-mean analysis window of one frame.
#[derive(Clone, Debug)]
pub struct FilteredFrame {
    /// Index of the source frame in the stack.
    pub index: usize,
    pub data: Array2<f64>,
    /// L2 norm of `data`.
    pub norm: f64,
}

impl FilteredFrame {
    fn new(index: usize, data: Array2<f64>) -> Self {
        let norm = data.iter().map(|v| v * v).sum::<f64>().sqrt();
        Self { index, data, norm }
    }

    /// A flat window has no structure to correlate against.
    pub fn is_degenerate(&self) -> bool {
        !(self.norm > DEGENERATE_NORM_EPSILON)
    }
}

/// Crop, smooth, edge-filter and zero-mean a single frame.
///
/// Filtering runs on the window grown by the filter support (clipped to the
/// frame), so window pixels are filtered from real neighbours. Pixels that
/// still fall on the Sobel border of that region are left at zero and kept
/// out of the mean.
pub fn crop_and_filter(
    data: &Array2<f32>,
    index: usize,
    extent: &Extent,
    sigma: f32,
) -> Result<FilteredFrame> {
    let (h, w) = data.dim();
    extent.check_bounds(h, w)?;

    let size = extent.size();
    let margin = (GAUSSIAN_RADIUS_SIGMAS * sigma).ceil() as usize + 1;
    let (r0, c0) = (
        extent.row0.saturating_sub(margin),
        extent.col0.saturating_sub(margin),
    );
    let (r1, c1) = (
        (extent.row0 + size + margin).min(h),
        (extent.col0 + size + margin).min(w),
    );
    let region = data.slice(s![r0..r1, c0..c1]).to_owned();
    let edges = sobel_magnitude(&gaussian_blur_array(&region, sigma));

    let (oy, ox) = (extent.row0 - r0, extent.col0 - c0);
    let (gh, gw) = edges.dim();
    let inside = |r: usize, c: usize| {
        let (y, x) = (oy + r, ox + c);
        y > 0 && y + 1 < gh && x > 0 && x + 1 < gw
    };
    let window = edges.slice(s![oy..oy + size, ox..ox + size]);

    let (sum, count) = window
        .indexed_iter()
        .filter(|&((r, c), _)| inside(r, c))
        .fold((0.0f64, 0usize), |(sum, n), (_, &v)| (sum + v as f64, n + 1));
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
    let centered = Array2::from_shape_fn((size, size), |(r, c)| {
        if inside(r, c) {
            window[[r, c]] as f64 - mean
        } else {
            0.0
        }
    });

    Ok(FilteredFrame::new(index, centered))
}

/// Filter the frames at `indices` in parallel.
///
/// `on_frame_done` receives the number of frames finished so far.
pub fn preprocess_frames(
    stack: &FrameStack,
    indices: &[usize],
    extent: &Extent,
    sigma: f32,
    on_frame_done: impl Fn(usize) + Send + Sync,
) -> Result<Vec<FilteredFrame>> {
    let (h, w) = stack.dim();
    extent.check_bounds(h, w)?;

    let counter = AtomicUsize::new(0);
    let filtered: Vec<FilteredFrame> = indices
        .par_iter()
        .map(|&index| {
            let frame = stack.frame(index)?;
            let filtered = crop_and_filter(&frame.data, index, extent, sigma)?;
            on_frame_done(counter.fetch_add(1, Ordering::Relaxed) + 1);
            Ok(filtered)
        })
        .collect::<Result<_>>()?;

    let degenerate = filtered.iter().filter(|f| f.is_degenerate()).count();
    if degenerate > 0 {
        debug!(degenerate, "Flat frames after filtering; their pairs get zero weight");
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(h: usize, w: usize) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(r, c)| {
            let dr = r as f32 - h as f32 / 2.0;
            let dc = c as f32 - w as f32 / 2.0;
            (-(dr * dr + dc * dc) / 40.0).exp()
        })
    }

    #[test]
    fn test_output_is_zero_mean_window() {
        let extent = Extent::centered((32, 32), 16).unwrap();
        let f = crop_and_filter(&blob(64, 64), 3, &extent, 1.0).unwrap();
        assert_eq!(f.data.dim(), (32, 32));
        assert_eq!(f.index, 3);
        assert!(f.data.sum().abs() < 1e-9);
        assert!(!f.is_degenerate());
    }

    #[test]
    fn test_window_on_frame_edge_has_zero_border() {
        let extent = Extent::centered((16, 16), 16).unwrap();
        let f = crop_and_filter(&blob(40, 40), 0, &extent, 1.0).unwrap();
        assert!(f.data.row(0).iter().all(|&v| v == 0.0));
        assert!(f.data.column(0).iter().all(|&v| v == 0.0));
        assert!(f.data.row(20).iter().any(|&v| v != 0.0));
        assert!(f.data.sum().abs() < 1e-9);
    }

    #[test]
    fn test_filtering_uses_pixels_around_the_window() {
        let frame = blob(64, 64);
        let extent = Extent::centered((32, 32), 8).unwrap();
        let f = crop_and_filter(&frame, 0, &extent, 1.0).unwrap();

        let grown = Extent::centered((32, 32), 16).unwrap();
        let g = crop_and_filter(&frame, 0, &grown, 1.0).unwrap();
        let inner = g.data.slice(s![8..24, 8..24]);
        // Same filtered content up to the per-window mean.
        let offset = f.data[[0, 0]] - inner[[0, 0]];
        for ((r, c), &v) in f.data.indexed_iter() {
            assert!((v - inner[[r, c]] - offset).abs() < 1e-6, "({r}, {c})");
        }
    }

    #[test]
    fn test_flat_frame_is_degenerate() {
        let extent = Extent::centered((16, 16), 8).unwrap();
        let flat = Array2::<f32>::from_elem((32, 32), 0.5);
        let f = crop_and_filter(&flat, 0, &extent, 2.0).unwrap();
        assert!(f.is_degenerate());
    }

    #[test]
    fn test_out_of_bounds_extent_rejected() {
        let extent = Extent::centered((40, 40), 16).unwrap();
        assert!(crop_and_filter(&blob(48, 48), 0, &extent, 1.0).is_err());
    }
}
