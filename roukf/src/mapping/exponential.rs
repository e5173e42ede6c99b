use nalgebra::RealField;

use super::ParameterMapper;

/// Keeps parameters strictly positive: filter value `ln p`, problem value
/// `exp f`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExponentialMapper;

impl<T: RealField + Copy> ParameterMapper<T> for ExponentialMapper {
    fn to_filter_space(&self, values: &mut [T]) {
        for v in values.iter_mut() {
            *v = v.ln();
        }
    }

    fn to_problem_space(&self, values: &mut [T]) {
        for v in values.iter_mut() {
            *v = v.exp();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trip() {
        let mut v = [0.5, 1.0, 42.0];
        ParameterMapper::<f64>::to_filter_space(&ExponentialMapper, &mut v);
        assert_relative_eq!(v[1], 0.0);
        ParameterMapper::<f64>::to_problem_space(&ExponentialMapper, &mut v);
        assert_relative_eq!(v[0], 0.5, epsilon = 1e-14);
        assert_relative_eq!(v[2], 42.0, epsilon = 1e-12);
    }

    #[test]
    fn problem_space_is_positive() {
        let mut v = [-50.0, 0.0, 3.0];
        ParameterMapper::<f64>::to_problem_space(&ExponentialMapper, &mut v);
        assert!(v.iter().all(|p| *p > 0.0));
    }

    #[test]
    fn non_positive_values_are_out_of_domain() {
        let mut v = [0.0, -1.0];
        ParameterMapper::<f64>::to_filter_space(&ExponentialMapper, &mut v);
        assert!(v.iter().all(|f| !f.is_finite()));
    }
}
