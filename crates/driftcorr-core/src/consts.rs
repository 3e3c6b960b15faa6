/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Norm below which a filtered frame is treated as flat (zero variance).
pub const DEGENERATE_NORM_EPSILON: f64 = 1e-12;

/// Gaussian kernel radius in units of sigma.
pub const GAUSSIAN_RADIUS_SIGMAS: f32 = 3.0;

/// Default half-size of the square correlation window, in pixels.
pub const DEFAULT_FFTSIZE: usize = 256;

/// Default gaussian smoothing scale applied before edge detection.
pub const DEFAULT_SIGMA: f32 = 3.0;

/// Default number of frames per side of a pair block.
pub const DEFAULT_BLOCK_SIZE: usize = 10;

/// Default confidence threshold on normalized pair weights.
pub const DEFAULT_MIN_NORMED_WEIGHT: f64 = 0.15;

/// Default upsampling factor of the DFT peak refinement (1/20 pixel).
pub const DEFAULT_UPSAMPLE_FACTOR: usize = 20;

/// Half-width, in pixels, of the region searched around the integer peak by
/// the upsampled DFT.
pub const UPSAMPLE_SEARCH_RADIUS: f64 = 0.75;
