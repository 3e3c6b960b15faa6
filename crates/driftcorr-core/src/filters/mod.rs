pub mod gaussian_blur;
pub mod sobel;

pub use gaussian_blur::gaussian_blur_array;
pub use sobel::sobel_magnitude;
