//! Scalar helpers to abstract math over f32 and f64

use nalgebra::RealField;

/// Conversion from counts and literal constants into the filter scalar.
pub trait ToScalar {
    fn from_count(n: usize) -> Self;

    fn from_constant(value: f64) -> Self;
}

impl<T: RealField> ToScalar for T {
    #[inline(always)]
    fn from_count(n: usize) -> Self {
        T::from_subset(&(n as f64)) // sigma-point counts stay far below 2^53
    }

    #[inline(always)]
    fn from_constant(value: f64) -> Self {
        T::from_subset(&value)
    }
}

/// Lossy view of a scalar as `f64`, used for error reports and logging.
#[inline(always)]
pub fn to_f64<T: RealField>(value: T) -> f64 {
    let narrowed: Option<f64> = value.to_subset();
    narrowed.unwrap_or(f64::NAN)
}

/// True when every value is finite.
pub fn all_finite<'a, T: RealField + Copy>(values: impl IntoIterator<Item = &'a T>) -> bool {
    values.into_iter().all(|v| v.is_finite())
}
