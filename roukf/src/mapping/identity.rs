use nalgebra::RealField;

use super::ParameterMapper;

/// Leaves parameters unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentityMapper;

impl<T: RealField + Copy> ParameterMapper<T> for IdentityMapper {
    fn to_filter_space(&self, _values: &mut [T]) {}

    fn to_problem_space(&self, _values: &mut [T]) {}
}
