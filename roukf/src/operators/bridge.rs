use std::panic::{catch_unwind, AssertUnwindSafe};

use nalgebra::RealField;

use super::{ForwardOperator, ObservationOperator};
use crate::mapping::ParameterMapper;
use crate::math::all_finite;

/// What happened to one sigma point during propagation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointStatus {
    Success,
    /// The forward operator reported failure.
    Failed,
    /// An operator panicked; the outputs are unusable.
    Panicked,
    /// The outputs contain NaN or infinite values.
    NonFinite,
    /// Not evaluated because the step was already known to fail.
    Skipped,
}

impl PointStatus {
    pub fn is_success(self) -> bool {
        self == PointStatus::Success
    }

    /// Outputs can still enter the statistics when failures are tolerated.
    pub fn is_usable(self) -> bool {
        matches!(self, PointStatus::Success | PointStatus::Failed)
    }
}

/// Propagated sigma point together with its predicted observation.
#[derive(Clone, Debug, PartialEq)]
pub struct PointOutcome<T> {
    /// Position of the point in the sigma-point set.
    pub index: usize,
    /// Propagated `[state; parameters]`, parameters in filter space.
    pub augmented: Vec<T>,
    pub observation: Vec<T>,
    pub status: PointStatus,
}

/// Runs the user operators for one sigma point.
///
/// Splits the augmented vector into state and parameters, maps the
/// parameters to problem space around the forward call, and evaluates the
/// observation operator on the propagated state. Panics raised by either
/// operator are caught and reported as [`PointStatus::Panicked`].
pub struct OperatorBridge<'a, T: RealField + Copy> {
    forward: &'a dyn ForwardOperator<T>,
    observation: &'a dyn ObservationOperator<T>,
    mapper: Option<&'a dyn ParameterMapper<T>>,
    n_states: usize,
    n_observations: usize,
}

impl<'a, T: RealField + Copy> OperatorBridge<'a, T> {
    pub fn new(
        forward: &'a dyn ForwardOperator<T>,
        observation: &'a dyn ObservationOperator<T>,
        n_states: usize,
        n_observations: usize,
    ) -> Self {
        Self {
            forward,
            observation,
            mapper: None,
            n_states,
            n_observations,
        }
    }

    pub fn with_mapper(mut self, mapper: Option<&'a dyn ParameterMapper<T>>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Propagate one sigma point.
    pub fn evaluate(&self, index: usize, mut augmented: Vec<T>) -> PointOutcome<T> {
        let mut observation = vec![T::zero(); self.n_observations];
        let status = catch_unwind(AssertUnwindSafe(|| {
            self.propagate(&mut augmented, &mut observation)
        }))
        .unwrap_or(PointStatus::Panicked);

        PointOutcome {
            index,
            augmented,
            observation,
            status,
        }
    }

    /// Outcome for a point that was never evaluated.
    pub fn skipped(&self, index: usize, augmented: Vec<T>) -> PointOutcome<T> {
        PointOutcome {
            index,
            augmented,
            observation: vec![T::zero(); self.n_observations],
            status: PointStatus::Skipped,
        }
    }

    fn propagate(&self, augmented: &mut [T], observation: &mut [T]) -> PointStatus {
        let split = self.n_states.min(augmented.len());
        let (state, parameters) = augmented.split_at_mut(split);

        if let Some(mapper) = self.mapper {
            mapper.to_problem_space(parameters);
        }
        let status = self.forward.forward(state, parameters);
        if let Some(mapper) = self.mapper {
            mapper.to_filter_space(parameters);
        }

        self.observation.observe(state, observation);

        if !all_finite(augmented.iter()) || !all_finite(observation.iter()) {
            PointStatus::NonFinite
        } else if status.is_success() {
            PointStatus::Success
        } else {
            PointStatus::Failed
        }
    }
}
