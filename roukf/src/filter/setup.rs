use nalgebra::{DMatrix, DVector, RealField};

use crate::error::{Quantity, Result};
use crate::sigma_points::SigmaDistribution;
use crate::state::{check_len, check_variances, Dimensions};

/// Everything `reset` needs to (re)initialize a filter.
///
/// Uncertainties are variances. Observation errors are taken as
/// independent, so `R` is diagonal.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterSetup<T> {
    pub dimensions: Dimensions,
    pub state_uncertainty: Vec<T>,
    pub parameter_uncertainty: Vec<T>,
    /// Defaults to unit variance per observation.
    pub observation_uncertainty: Option<Vec<T>>,
    pub distribution: SigmaDistribution,
}

impl<T: RealField + Copy> FilterSetup<T> {
    pub fn new(
        n_observations: usize,
        n_states: usize,
        n_parameters: usize,
        state_uncertainty: impl Into<Vec<T>>,
        parameter_uncertainty: impl Into<Vec<T>>,
        distribution: SigmaDistribution,
    ) -> Self {
        Self {
            dimensions: Dimensions::new(n_observations, n_states, n_parameters),
            state_uncertainty: state_uncertainty.into(),
            parameter_uncertainty: parameter_uncertainty.into(),
            observation_uncertainty: None,
            distribution,
        }
    }

    pub fn with_observation_uncertainty(mut self, uncertainty: impl Into<Vec<T>>) -> Self {
        self.observation_uncertainty = Some(uncertainty.into());
        self
    }

    /// Diagonal observation error covariance `R`.
    pub(crate) fn observation_noise(&self) -> Result<DMatrix<T>> {
        let m = self.dimensions.n_observations;
        match &self.observation_uncertainty {
            Some(values) => {
                check_len(Quantity::ObservationUncertainty, m, values.len())?;
                check_variances(Quantity::ObservationUncertainty, values)?;
                Ok(DMatrix::from_diagonal(&DVector::from_column_slice(values)))
            }
            None => Ok(DMatrix::identity(m, m)),
        }
    }
}
