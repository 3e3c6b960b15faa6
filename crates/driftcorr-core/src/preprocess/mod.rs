//! Frame preparation for pairwise correlation.
//!
//! Each selected frame is cropped to a square analysis window, smoothed,
//! reduced to its Sobel edge strength and made zero-mean, so correlation
//! peaks reflect registrable structure rather than illumination.

mod extent;
mod filter;

pub use extent::Extent;
pub use filter::{crop_and_filter, preprocess_frames, FilteredFrame};
