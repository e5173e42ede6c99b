//! Reduced-order unscented Kalman filter.
//!
//! [`RoukfFilter`] owns the augmented state estimate and advances it one
//! observation at a time. Each step generates sigma points from the current
//! mean and square-root covariance, propagates them through the user's
//! forward and observation operators, and applies the unscented Kalman
//! update. A step either commits completely or leaves the estimate as it
//! was.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --reset--> Ready --execute_step--> Stepping --ok--> Ready
//!                                                     |
//!                                                     +--error--> Faulted (or Ready with auto_recover)
//! Faulted --reset / clear_fault--> Ready
//! ```

use core::fmt;

use log::{debug, error, info, warn};
use nalgebra::{DMatrix, DVector, RealField};

use crate::error::{FilterError, Quantity, Result};
use crate::kf::KalmanUpdateEngine;
use crate::mapping::{checked_to_filter_space, ParameterMapper};
use crate::math::{to_f64, ToScalar};
use crate::operators::{ForwardOperator, ObservationOperator, OperatorBridge};
use crate::parallel::{Communicator, EnsemblePropagator, SingleProcess};
use crate::state::{check_len, AugmentedState, Dimensions};

pub use self::options::{Convergence, FailurePolicy, FilterOptions};
pub use self::setup::FilterSetup;

mod options;
mod setup;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterPhase {
    /// No dimensions have been supplied yet.
    Uninitialized,
    Ready,
    /// A step is in progress.
    Stepping,
    /// The last step failed; the estimate is the one from before that step.
    Faulted,
}

/// Report of a committed step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepStatus<T> {
    iteration: u64,
    error: T,
    degraded: bool,
    regularized: bool,
    failed_points: Vec<usize>,
    authoritative: bool,
}

impl<T: Copy> StepStatus<T> {
    /// Number of committed steps, this one included.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Euclidean norm of the innovation of this step.
    pub fn error(&self) -> T {
        self.error
    }

    /// Some sigma points failed and the step continued under a tolerant
    /// failure policy.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The innovation covariance needed diagonal regularization.
    pub fn was_regularized(&self) -> bool {
        self.regularized
    }

    pub fn failed_points(&self) -> &[usize] {
        &self.failed_points
    }

    /// Every sigma point propagated successfully.
    pub fn succeeded(&self) -> bool {
        !self.degraded
    }

    /// Reported by rank 0, which owns diagnostics output.
    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }
}

#[derive(Clone, Debug)]
struct Tracking<T> {
    iteration: u64,
    previous_error: Option<T>,
    current_error: Option<T>,
    innovation: Vec<T>,
}

impl<T: RealField + Copy> Tracking<T> {
    fn new(n_observations: usize) -> Self {
        Self {
            iteration: 0,
            previous_error: None,
            current_error: None,
            innovation: vec![T::zero(); n_observations],
        }
    }

    fn record(&mut self, error: T, innovation: DVector<T>) {
        self.iteration += 1;
        self.previous_error = self.current_error.replace(error);
        self.innovation = innovation.iter().copied().collect();
    }
}

/// State that only exists once dimensions are known.
#[derive(Clone, Debug)]
struct Initialized<T: RealField + Copy> {
    setup: FilterSetup<T>,
    model: AugmentedState<T>,
    observation_noise: DMatrix<T>,
    engine: KalmanUpdateEngine<T>,
    tracking: Tracking<T>,
}

impl<T: RealField + Copy> Initialized<T> {
    fn step<F, H>(
        &mut self,
        observations: &[T],
        forward: &F,
        observation: &H,
        options: &FilterOptions,
        mapper: Option<&dyn ParameterMapper<T>>,
        comm: &dyn Communicator<T>,
    ) -> Result<StepStatus<T>>
    where
        F: ForwardOperator<T>,
        H: ObservationOperator<T>,
    {
        let dims = self.model.dimensions();
        let sigma = self
            .setup
            .distribution
            .generate(self.model.mean(), self.model.sqrt_covariance());

        let bridge = OperatorBridge::new(forward, observation, dims.n_states, dims.n_observations)
            .with_mapper(mapper);
        let propagator =
            EnsemblePropagator::new(options.threads, options.partition, options.failure_policy);
        let ensemble = propagator.propagate(&sigma, &bridge, comm)?;

        let z = DVector::from_column_slice(observations);
        let update = self.engine.update(&ensemble, &z, &self.observation_noise)?;

        // commit
        self.model.commit(update.mean, update.sqrt_covariance);
        self.tracking.record(update.error, update.innovation);

        Ok(StepStatus {
            iteration: self.tracking.iteration,
            error: update.error,
            degraded: ensemble.degraded,
            regularized: update.regularized,
            failed_points: ensemble.failed,
            authoritative: comm.is_root(),
        })
    }
}

/// Reduced-order unscented Kalman filter over `[state; parameters]`.
pub struct RoukfFilter<T: RealField + Copy = f64> {
    phase: FilterPhase,
    core: Option<Initialized<T>>,
    options: FilterOptions,
    mapper: Option<Box<dyn ParameterMapper<T>>>,
    communicator: Box<dyn Communicator<T>>,
}

impl<T: RealField + Copy> fmt::Debug for RoukfFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoukfFilter")
            .field("phase", &self.phase)
            .field("core", &self.core)
            .field("options", &self.options)
            .field("mapper", &self.mapper)
            .field("rank", &self.communicator.rank())
            .finish()
    }
}

impl<T: RealField + Copy> Default for RoukfFilter<T> {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl<T: RealField + Copy> RoukfFilter<T> {
    /// A filter with no dimensions yet. Call [`reset`](Self::reset) before
    /// anything else.
    pub fn uninitialized() -> Self {
        Self {
            phase: FilterPhase::Uninitialized,
            core: None,
            options: FilterOptions::default(),
            mapper: None,
            communicator: Box::new(SingleProcess),
        }
    }

    /// Create and initialize a filter in one go.
    pub fn new(setup: FilterSetup<T>) -> Result<Self> {
        let mut filter = Self::uninitialized();
        filter.reset(setup)?;
        Ok(filter)
    }

    pub fn with_options(mut self, options: FilterOptions) -> Result<Self> {
        self.set_options(options)?;
        Ok(self)
    }

    /// Run collectively with the other ranks of `communicator`.
    pub fn with_communicator(mut self, communicator: impl Communicator<T> + 'static) -> Self {
        self.communicator = Box::new(communicator);
        self
    }

    pub fn with_parameter_mapper(
        mut self,
        mapper: impl ParameterMapper<T> + 'static,
    ) -> Result<Self> {
        self.replace_parameter_mapper(Box::new(mapper))?;
        Ok(self)
    }

    pub fn set_options(&mut self, options: FilterOptions) -> Result<()> {
        options.validate()?;
        if let Some(core) = self.core.as_mut() {
            core.engine = KalmanUpdateEngine::new(T::from_constant(options.regularization));
        }
        self.options = options;
        Ok(())
    }

    /// (Re)initialize dimensions, uncertainties and sigma-point layout.
    ///
    /// The mean is set to zero in filter space and the iteration history is
    /// cleared. Works from every phase; on error the filter is unchanged.
    /// All ranks of a communicator group must reset together.
    pub fn reset(&mut self, setup: FilterSetup<T>) -> Result<()> {
        let dims = setup.dimensions;
        let model = AugmentedState::new(dims, &setup.state_uncertainty, &setup.parameter_uncertainty)?;
        let observation_noise = setup.observation_noise()?;
        if let Some(arity) = self.mapper.as_ref().and_then(|m| m.arity()) {
            check_len(Quantity::Mapper, dims.n_parameters, arity)?;
        }

        if self.communicator.is_root() {
            info!(
                "filter initialized: {} states, {} parameters, {} observations, {} {:?} sigma points",
                dims.n_states,
                dims.n_parameters,
                dims.n_observations,
                setup.distribution.point_count(dims.augmented()),
                setup.distribution
            );
        }

        self.core = Some(Initialized {
            engine: KalmanUpdateEngine::new(T::from_constant(self.options.regularization)),
            tracking: Tracking::new(dims.n_observations),
            setup,
            model,
            observation_noise,
        });
        self.phase = FilterPhase::Ready;
        Ok(())
    }

    /// Install a new mapper. The filter-space estimate and covariance are
    /// kept and read through the new mapper from now on.
    pub fn replace_parameter_mapper(&mut self, mapper: Box<dyn ParameterMapper<T>>) -> Result<()> {
        if let (Some(core), Some(arity)) = (self.core.as_ref(), mapper.arity()) {
            check_len(Quantity::Mapper, core.model.dimensions().n_parameters, arity)?;
        }
        self.mapper = Some(mapper);
        Ok(())
    }

    /// Remove the mapper; filter-space parameters are reported as they are.
    pub fn clear_parameter_mapper(&mut self) {
        self.mapper = None;
    }

    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// True on rank 0 of the communicator group.
    pub fn is_root(&self) -> bool {
        self.communicator.is_root()
    }

    fn core(&self) -> Result<&Initialized<T>> {
        self.core.as_ref().ok_or(FilterError::UninitializedUse)
    }

    fn core_mut(&mut self) -> Result<&mut Initialized<T>> {
        self.core.as_mut().ok_or(FilterError::UninitializedUse)
    }

    pub fn dimensions(&self) -> Result<Dimensions> {
        Ok(self.core()?.model.dimensions())
    }

    pub fn sigma_point_count(&self) -> Result<usize> {
        let core = self.core()?;
        Ok(core
            .setup
            .distribution
            .point_count(core.model.dimensions().augmented()))
    }

    /// Read-only view of the estimate; parameters in filter space.
    pub fn augmented_state(&self) -> Result<&AugmentedState<T>> {
        Ok(&self.core()?.model)
    }

    pub fn state(&self) -> Result<Vec<T>> {
        Ok(self.core()?.model.state().to_vec())
    }

    /// Current parameter estimate in problem space.
    pub fn parameters(&self) -> Result<Vec<T>> {
        let mut values = self.core()?.model.parameters().to_vec();
        if let Some(mapper) = &self.mapper {
            mapper.to_problem_space(&mut values);
        }
        Ok(values)
    }

    pub fn set_state(&mut self, values: &[T]) -> Result<()> {
        self.core_mut()?.model.set_state(values)
    }

    /// Overwrite the parameter estimate, given in problem space.
    pub fn set_parameters(&mut self, values: &[T]) -> Result<()> {
        let core = self.core.as_mut().ok_or(FilterError::UninitializedUse)?;
        check_len(
            Quantity::Parameters,
            core.model.dimensions().n_parameters,
            values.len(),
        )?;
        let mapped = match &self.mapper {
            Some(mapper) => checked_to_filter_space(mapper.as_ref(), values)?,
            None => values.to_vec(),
        };
        core.model.set_parameters(&mapped)
    }

    /// Full augmented covariance `S Sᵀ` (filter space).
    pub fn covariance(&self) -> Result<DMatrix<T>> {
        Ok(self.core()?.model.covariance())
    }

    /// Marginal standard deviations of the parameters (filter space).
    pub fn parameter_std(&self) -> Result<Vec<T>> {
        Ok(self.core()?.model.parameter_std())
    }

    /// Innovation of the last committed step, zeros before the first one.
    pub fn observation_errors(&self) -> Result<Vec<T>> {
        Ok(self.core()?.tracking.innovation.clone())
    }

    /// Innovation of observation `index` from the last committed step.
    pub fn observation_error(&self, index: usize) -> Result<T> {
        let innovation = &self.core()?.tracking.innovation;
        innovation
            .get(index)
            .copied()
            .ok_or(FilterError::DimensionMismatch {
                quantity: Quantity::Observations,
                expected: innovation.len(),
                actual: index.saturating_add(1),
            })
    }

    /// Number of committed steps since the last reset.
    pub fn iteration(&self) -> u64 {
        self.core.as_ref().map_or(0, |c| c.tracking.iteration)
    }

    /// Innovation norm of the last committed step.
    pub fn last_error(&self) -> Option<T> {
        self.core.as_ref().and_then(|c| c.tracking.current_error)
    }

    /// Compare the innovation norms of the last two steps against the
    /// configured tolerance. Always false before the second step.
    pub fn has_converged(&self, mode: Convergence) -> bool {
        let Some(core) = self.core.as_ref() else {
            return false;
        };
        let tracking = &core.tracking;
        let (Some(previous), Some(current)) = (tracking.previous_error, tracking.current_error)
        else {
            return false;
        };
        if tracking.iteration <= 1 {
            return false;
        }

        let diff = to_f64((current - previous).abs());
        let tol = self.options.convergence_tolerance;
        match mode {
            Convergence::Absolute => diff < tol,
            Convergence::Relative => {
                let scale = to_f64(previous.abs());
                if scale == 0.0 {
                    diff == 0.0
                } else {
                    diff / scale < tol
                }
            }
        }
    }

    /// The configured iteration budget is used up.
    pub fn iterations_exhausted(&self) -> bool {
        self.iteration() >= self.options.max_iterations
    }

    /// Leave the `Faulted` phase keeping the pre-failure estimate.
    pub fn clear_fault(&mut self) -> Result<()> {
        match self.phase {
            FilterPhase::Uninitialized => Err(FilterError::UninitializedUse),
            FilterPhase::Faulted => {
                self.phase = FilterPhase::Ready;
                Ok(())
            }
            FilterPhase::Ready | FilterPhase::Stepping => Ok(()),
        }
    }

    /// Assimilate one observation vector.
    ///
    /// # Arguments
    /// * `observations` - measured values, one per configured observation
    /// * `forward` - advances one sigma point; called once per point
    /// * `observation` - predicts observations from a propagated state
    ///
    /// On success the new estimate is committed and a [`StepStatus`] is
    /// returned. On error the estimate is untouched and the filter moves to
    /// `Faulted`, or stays `Ready` when `auto_recover` is set. A length
    /// mismatch of `observations` is rejected before anything runs and
    /// does not fault the filter.
    pub fn execute_step<F, H>(
        &mut self,
        observations: &[T],
        forward: &F,
        observation: &H,
    ) -> Result<StepStatus<T>>
    where
        F: ForwardOperator<T>,
        H: ObservationOperator<T>,
    {
        match self.phase {
            FilterPhase::Uninitialized => return Err(FilterError::UninitializedUse),
            FilterPhase::Faulted => return Err(FilterError::Faulted),
            FilterPhase::Ready | FilterPhase::Stepping => {}
        }

        let Self {
            phase,
            core,
            options,
            mapper,
            communicator,
        } = self;
        let core = core.as_mut().ok_or(FilterError::UninitializedUse)?;
        check_len(
            Quantity::Observations,
            core.model.dimensions().n_observations,
            observations.len(),
        )?;

        *phase = FilterPhase::Stepping;
        let result = core.step(
            observations,
            forward,
            observation,
            options,
            mapper.as_deref(),
            &**communicator,
        );

        match result {
            Ok(status) => {
                *phase = FilterPhase::Ready;
                if status.authoritative {
                    debug!(
                        "step {}: innovation norm {}{}",
                        status.iteration,
                        status.error,
                        if status.degraded { " (degraded)" } else { "" }
                    );
                }
                Ok(status)
            }
            Err(err) => {
                if options.auto_recover {
                    warn!("step failed, estimate kept: {err}");
                    *phase = FilterPhase::Ready;
                } else {
                    error!("step failed, filter faulted: {err}");
                    *phase = FilterPhase::Faulted;
                }
                Err(err)
            }
        }
    }
}
