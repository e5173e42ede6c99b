//! Run-time options of the filter.

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};
use crate::parallel::Partition;

/// What a step does when the forward operator fails for some sigma points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the step with [`FilterError::OperatorFailure`].
    #[default]
    Abort,
    /// Exclude failed points and renormalize the remaining weights.
    DropAndRenormalize,
    /// Keep the outputs of failed points and flag the step as degraded.
    /// Points whose outputs are unusable are dropped.
    ReportDegraded,
}

/// Convergence criterion on the innovation norm of consecutive steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convergence {
    /// `|e_k - e_{k-1}| < tol`
    Absolute,
    /// `|e_k - e_{k-1}| / e_{k-1} < tol`
    Relative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub failure_policy: FailurePolicy,
    /// Return to `Ready` instead of `Faulted` after a failed step.
    pub auto_recover: bool,
    /// Worker threads per process for sigma-point propagation.
    pub threads: usize,
    pub partition: Partition,
    /// Relative diagonal inflation applied when the innovation covariance
    /// cannot be factorized.
    pub regularization: f64,
    pub convergence_tolerance: f64,
    pub max_iterations: u64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            auto_recover: false,
            threads: 1,
            partition: Partition::Contiguous,
            regularization: 1e-9,
            convergence_tolerance: 1e-5,
            max_iterations: 1000,
        }
    }
}

impl FilterOptions {
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_auto_recover(mut self, auto_recover: bool) -> Self {
        self.auto_recover = auto_recover;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(FilterError::InvalidConfiguration(
                "threads must be at least 1".into(),
            ));
        }
        if !(self.regularization.is_finite() && self.regularization > 0.0) {
            return Err(FilterError::InvalidConfiguration(format!(
                "regularization must be positive, got {}",
                self.regularization
            )));
        }
        if !(self.convergence_tolerance.is_finite() && self.convergence_tolerance >= 0.0) {
            return Err(FilterError::InvalidConfiguration(format!(
                "convergence tolerance must be non-negative, got {}",
                self.convergence_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = FilterOptions::default();
        assert_eq!(o.failure_policy, FailurePolicy::Abort);
        assert!(!o.auto_recover);
        assert_eq!(o.threads, 1);
        assert_eq!(o.regularization, 1e-9);
        assert_eq!(o.convergence_tolerance, 1e-5);
        assert_eq!(o.max_iterations, 1000);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let o: FilterOptions =
            serde_json::from_str(r#"{"failure_policy": "drop_and_renormalize", "threads": 4}"#)
                .unwrap();
        assert_eq!(o.failure_policy, FailurePolicy::DropAndRenormalize);
        assert_eq!(o.threads, 4);
        assert_eq!(o.partition, Partition::Contiguous);
        assert_eq!(o.max_iterations, 1000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(FilterOptions::default().with_threads(0).validate().is_err());
        assert!(FilterOptions::default()
            .with_regularization(0.0)
            .validate()
            .is_err());
        assert!(FilterOptions::default()
            .with_convergence_tolerance(f64::NAN)
            .validate()
            .is_err());
    }
}
