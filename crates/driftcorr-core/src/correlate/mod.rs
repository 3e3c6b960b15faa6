//! Pairwise cross-correlation of filtered frames.
//!
//! Every unordered pair of sampled frames is correlated once in the
//! frequency domain and reduced straight away to its peak, so correlation
//! surfaces never outlive the pair that produced them.

mod fft;
mod pairwise;
mod peak;
mod upsample;

pub use fft::Fft2d;
pub use pairwise::{PairBlock, PairResult, PairwiseCorrelator, Spectrum};
pub use peak::{find_peak, refine_peak_parabolic, PairEstimate, Peak};
pub use upsample::refine_peak_upsampled;
