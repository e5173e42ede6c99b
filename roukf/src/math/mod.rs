//! Small numeric helpers shared across the crate.

pub mod scalar;

pub use scalar::{all_finite, to_f64, ToScalar};
