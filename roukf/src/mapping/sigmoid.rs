use nalgebra::RealField;

use super::ParameterMapper;

/// Keeps parameters inside the open interval `(min, max)`.
///
/// Problem value `p = min + (max - min) / (1 + e^-f)`, filter value
/// `f = -ln((max - min) / (p - min) - 1)`. A filter value of zero maps to
/// the middle of the interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SigmoidMapper<T> {
    pub min: T,
    pub max: T,
}

impl<T: RealField + Copy> SigmoidMapper<T> {
    /// Returns `None` unless `min < max` and both are finite.
    pub fn new(min: T, max: T) -> Option<Self> {
        (min.is_finite() && max.is_finite() && min < max).then_some(Self { min, max })
    }
}

impl<T: RealField + Copy> ParameterMapper<T> for SigmoidMapper<T> {
    fn to_filter_space(&self, values: &mut [T]) {
        let range = self.max - self.min;
        // values on or outside the bounds come out as NaN or infinite
        for v in values.iter_mut() {
            *v = -(range / (*v - self.min) - T::one()).ln();
        }
    }

    fn to_problem_space(&self, values: &mut [T]) {
        let range = self.max - self.min;
        for v in values.iter_mut() {
            *v = self.min + range / (T::one() + (-*v).exp());
        }
    }
}
