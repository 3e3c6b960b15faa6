//! Reconciliation of pairwise shift estimates into per-frame shifts.

mod interpolate;
mod mask;
mod matrices;
mod solve;

pub use interpolate::{interpolate_shifts, DenseShifts};
pub use mask::{threshold_and_mask, MaskedPairs};
pub use matrices::HalfMatrices;
pub use solve::{calc_shift_vectors, connected_components, ShiftTrajectory};
