//! Augmented state model: physical state and parameters estimated jointly.
//!
//! The mean is stored as one vector `[state; parameters]` and the spread
//! as a square-root factor `S` with `P = S Sᵀ`.

use nalgebra::{DMatrix, DVector, RealField};

use crate::error::{FilterError, Quantity, Result};

/// Sizes fixed at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub n_observations: usize,
    pub n_states: usize,
    pub n_parameters: usize,
}

impl Dimensions {
    pub fn new(n_observations: usize, n_states: usize, n_parameters: usize) -> Self {
        Self {
            n_observations,
            n_states,
            n_parameters,
        }
    }

    /// Length of the augmented vector.
    pub fn augmented(&self) -> usize {
        self.n_states + self.n_parameters
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.augmented() == 0 {
            return Err(FilterError::InvalidConfiguration(
                "at least one state or parameter is required".into(),
            ));
        }
        if self.n_observations == 0 {
            return Err(FilterError::InvalidConfiguration(
                "at least one observation is required".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_len(quantity: Quantity, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(FilterError::DimensionMismatch {
            quantity,
            expected,
            actual,
        })
    }
}

pub(crate) fn check_variances<T: RealField + Copy>(quantity: Quantity, values: &[T]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite() || *v < T::zero()) {
        Some(i) => Err(FilterError::InvalidConfiguration(format!(
            "{quantity} entry {i} must be a finite, non-negative variance"
        ))),
        None => Ok(()),
    }
}

/// Mean and square-root covariance of the augmented state.
#[derive(Clone, Debug)]
pub struct AugmentedState<T: RealField + Copy> {
    dims: Dimensions,
    mean: DVector<T>,
    sqrt_cov: DMatrix<T>,
}

impl<T: RealField + Copy> AugmentedState<T> {
    /// Zero mean with a diagonal covariance built from the given variances.
    ///
    /// # Arguments
    /// * `state_uncertainty` - one variance per state, zero allowed
    /// * `parameter_uncertainty` - one variance per parameter, zero allowed
    pub fn new(
        dims: Dimensions,
        state_uncertainty: &[T],
        parameter_uncertainty: &[T],
    ) -> Result<Self> {
        dims.validate()?;
        check_len(
            Quantity::StateUncertainty,
            dims.n_states,
            state_uncertainty.len(),
        )?;
        check_len(
            Quantity::ParameterUncertainty,
            dims.n_parameters,
            parameter_uncertainty.len(),
        )?;
        check_variances(Quantity::StateUncertainty, state_uncertainty)?;
        check_variances(Quantity::ParameterUncertainty, parameter_uncertainty)?;

        let n = dims.augmented();
        let std_devs = DVector::from_iterator(
            n,
            state_uncertainty
                .iter()
                .chain(parameter_uncertainty)
                .map(|v| v.sqrt()),
        );

        Ok(Self {
            dims,
            mean: DVector::zeros(n),
            sqrt_cov: DMatrix::from_diagonal(&std_devs),
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn mean(&self) -> &DVector<T> {
        &self.mean
    }

    pub fn sqrt_covariance(&self) -> &DMatrix<T> {
        &self.sqrt_cov
    }

    /// Full covariance `S Sᵀ`.
    pub fn covariance(&self) -> DMatrix<T> {
        &self.sqrt_cov * self.sqrt_cov.transpose()
    }

    pub fn state(&self) -> &[T] {
        &self.mean.as_slice()[..self.dims.n_states]
    }

    pub fn parameters(&self) -> &[T] {
        &self.mean.as_slice()[self.dims.n_states..]
    }

    /// Overwrite the state block of the mean. Leaves everything untouched on
    /// a length mismatch.
    pub fn set_state(&mut self, values: &[T]) -> Result<()> {
        check_len(Quantity::States, self.dims.n_states, values.len())?;
        self.mean.as_mut_slice()[..self.dims.n_states].copy_from_slice(values);
        Ok(())
    }

    /// Overwrite the parameter block of the mean (filter space).
    pub fn set_parameters(&mut self, values: &[T]) -> Result<()> {
        check_len(Quantity::Parameters, self.dims.n_parameters, values.len())?;
        self.mean.as_mut_slice()[self.dims.n_states..].copy_from_slice(values);
        Ok(())
    }

    /// Marginal standard deviations of the parameters.
    pub fn parameter_std(&self) -> Vec<T> {
        (self.dims.n_states..self.dims.augmented())
            .map(|i| self.sqrt_cov.row(i).norm())
            .collect()
    }

    /// Replace mean and factor after a successful update.
    pub(crate) fn commit(&mut self, mean: DVector<T>, sqrt_cov: DMatrix<T>) {
        debug_assert_eq!(mean.len(), self.dims.augmented());
        debug_assert_eq!(sqrt_cov.shape(), (mean.len(), mean.len()));
        self.mean = mean;
        self.sqrt_cov = sqrt_cov;
    }
}
