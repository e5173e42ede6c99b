//! Parameter reparameterization
//!
//! The filter estimates parameters in an unconstrained "filter space". A
//! [`ParameterMapper`] converts between that space and the "problem space"
//! seen by the forward operator, e.g. to keep a parameter positive or
//! inside a bounded interval.
//!
//! # Properties
//!
//! Implementations must satisfy, for every problem-space `p` in the domain:
//! 1. `to_problem_space(to_filter_space(p)) ≈ p`
//! 2. `to_problem_space` accepts any finite filter-space value

use core::fmt::Debug;

use nalgebra::RealField;

use crate::error::{FilterError, Result};
use crate::math::to_f64;

pub use self::composite::CompositeMapper;
pub use self::exponential::ExponentialMapper;
pub use self::identity::IdentityMapper;
pub use self::sigmoid::SigmoidMapper;

mod composite;
mod exponential;
mod identity;
mod sigmoid;

/// In-place conversion of a parameter vector between spaces.
pub trait ParameterMapper<T: RealField + Copy>: Send + Sync + Debug {
    /// Problem space to filter space.
    fn to_filter_space(&self, values: &mut [T]);

    /// Filter space to problem space.
    fn to_problem_space(&self, values: &mut [T]);

    /// Number of parameters the mapper is laid out for, `None` if any
    /// length is accepted.
    fn arity(&self) -> Option<usize> {
        None
    }
}

/// Map problem-space `values` into filter space, rejecting values outside
/// the mapper domain.
pub fn checked_to_filter_space<T: RealField + Copy>(
    mapper: &dyn ParameterMapper<T>,
    values: &[T],
) -> Result<Vec<T>> {
    let mut mapped = values.to_vec();
    mapper.to_filter_space(&mut mapped);
    match mapped.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(FilterError::InvalidParameter {
            index,
            value: to_f64(values[index]),
        }),
        None => Ok(mapped),
    }
}
