use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, RealField};

use super::{Communicator, Partition};
use crate::error::{FilterError, Result};
use crate::filter::FailurePolicy;
use crate::operators::{OperatorBridge, PointOutcome, PointStatus};
use crate::sigma_points::{weights, SigmaPointSet};

/// Propagated ensemble ready for the statistical update.
///
/// Columns are ordered by sigma-point index; dropped points are absent and
/// `weights` is renormalized over the remaining ones.
#[derive(Clone, Debug)]
pub struct PropagatedEnsemble<T: RealField + Copy> {
    /// Propagated augmented points, one per column.
    pub points: DMatrix<T>,
    /// Predicted observations, one per column.
    pub observations: DMatrix<T>,
    pub weights: DVector<T>,
    /// Indices of sigma points whose propagation did not succeed.
    pub failed: Vec<usize>,
    /// The ensemble no longer matches the generated sigma points.
    pub degraded: bool,
}

/// Runs the operator bridge over a sigma-point set.
#[derive(Clone, Copy, Debug)]
pub struct EnsemblePropagator {
    threads: usize,
    partition: Partition,
    policy: FailurePolicy,
}

impl Default for EnsemblePropagator {
    fn default() -> Self {
        Self::new(1, Partition::default(), FailurePolicy::default())
    }
}

impl EnsemblePropagator {
    pub fn new(threads: usize, partition: Partition, policy: FailurePolicy) -> Self {
        Self {
            threads: threads.max(1),
            partition,
            policy,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Propagate every point of `sigma` and collect the results of all
    /// ranks of `comm`.
    ///
    /// The output does not depend on the thread count, the partition or
    /// the number of ranks.
    pub fn propagate<T: RealField + Copy>(
        &self,
        sigma: &SigmaPointSet<T>,
        bridge: &OperatorBridge<'_, T>,
        comm: &dyn Communicator<T>,
    ) -> Result<PropagatedEnsemble<T>> {
        let count = sigma.len();
        let assigned = self.partition.assign(count, comm.size(), comm.rank());
        debug!(
            "rank {} propagating {} of {} sigma points on {} thread(s)",
            comm.rank(),
            assigned.len(),
            count,
            self.threads
        );

        let local = self.evaluate_local(sigma, bridge, &assigned)?;
        let gathered = comm.all_gather(local)?;
        let ordered = into_index_order(gathered, count)?;
        self.resolve(ordered, sigma.weights(), bridge.n_observations())
    }

    fn evaluate_local<T: RealField + Copy>(
        &self,
        sigma: &SigmaPointSet<T>,
        bridge: &OperatorBridge<'_, T>,
        assigned: &[usize],
    ) -> Result<Vec<PointOutcome<T>>> {
        let cancelled = AtomicBool::new(false);
        let workers = self.threads.min(assigned.len()).max(1);
        if workers == 1 {
            return Ok(self.run_points(sigma, bridge, assigned, &cancelled));
        }

        let cancelled = &cancelled;
        crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let mine: Vec<usize> = self
                        .partition
                        .assign(assigned.len(), workers, worker)
                        .into_iter()
                        .map(|k| assigned[k])
                        .collect();
                    scope.spawn(move |_| self.run_points(sigma, bridge, &mine, cancelled))
                })
                .collect();

            let mut outcomes = Vec::with_capacity(assigned.len());
            for handle in handles {
                let batch = handle.join().map_err(|_| {
                    FilterError::Communication("sigma-point worker thread panicked".into())
                })?;
                outcomes.extend(batch);
            }
            Ok::<_, FilterError>(outcomes)
        })
        .map_err(|_| FilterError::Communication("sigma-point worker thread panicked".into()))?
    }

    fn run_points<T: RealField + Copy>(
        &self,
        sigma: &SigmaPointSet<T>,
        bridge: &OperatorBridge<'_, T>,
        indices: &[usize],
        cancelled: &AtomicBool,
    ) -> Vec<PointOutcome<T>> {
        let abort = self.policy == FailurePolicy::Abort;
        indices
            .iter()
            .map(|&index| {
                let augmented: Vec<T> = sigma.point(index).iter().copied().collect();
                if abort && cancelled.load(Ordering::Relaxed) {
                    return bridge.skipped(index, augmented);
                }
                let outcome = bridge.evaluate(index, augmented);
                if abort && !outcome.status.is_success() {
                    cancelled.store(true, Ordering::Relaxed);
                }
                outcome
            })
            .collect()
    }

    /// Apply the failure policy and assemble the ensemble matrices.
    fn resolve<T: RealField + Copy>(
        &self,
        outcomes: Vec<PointOutcome<T>>,
        sigma_weights: &DVector<T>,
        n_observations: usize,
    ) -> Result<PropagatedEnsemble<T>> {
        let failed: Vec<usize> = outcomes
            .iter()
            .filter(|o| !o.status.is_success() && o.status != PointStatus::Skipped)
            .map(|o| o.index)
            .collect();

        let keep: Vec<bool> = match self.policy {
            FailurePolicy::Abort => {
                if !failed.is_empty() {
                    return Err(FilterError::OperatorFailure { failed });
                }
                vec![true; outcomes.len()]
            }
            FailurePolicy::DropAndRenormalize => {
                outcomes.iter().map(|o| o.status.is_success()).collect()
            }
            FailurePolicy::ReportDegraded => {
                outcomes.iter().map(|o| o.status.is_usable()).collect()
            }
        };

        let weights = weights::renormalized(sigma_weights, &keep).ok_or_else(|| {
            FilterError::OperatorFailure {
                failed: failed.clone(),
            }
        })?;

        if !failed.is_empty() {
            warn!(
                "{} of {} sigma points failed ({:?}); continuing with {} under {:?}",
                failed.len(),
                outcomes.len(),
                failed,
                weights.len(),
                self.policy
            );
        }

        let kept: Vec<&PointOutcome<T>> = outcomes
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(o, _)| o)
            .collect();
        let n = kept.first().map_or(0, |o| o.augmented.len());
        let points = DMatrix::from_fn(n, kept.len(), |r, c| kept[c].augmented[r]);
        let observations = DMatrix::from_fn(n_observations, kept.len(), |r, c| kept[c].observation[r]);

        Ok(PropagatedEnsemble {
            points,
            observations,
            weights,
            degraded: !failed.is_empty(),
            failed,
        })
    }
}

/// Sort gathered outcomes by index, checking that each of `0..count`
/// appears exactly once.
fn into_index_order<T>(gathered: Vec<PointOutcome<T>>, count: usize) -> Result<Vec<PointOutcome<T>>> {
    let mut slots: Vec<Option<PointOutcome<T>>> = (0..count).map(|_| None).collect();
    for outcome in gathered {
        let index = outcome.index;
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(outcome),
            Some(_) => {
                return Err(FilterError::Communication(format!(
                    "sigma point {index} was reported twice"
                )))
            }
            None => {
                return Err(FilterError::Communication(format!(
                    "sigma point {index} is out of range"
                )))
            }
        }
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| {
                FilterError::Communication(format!("sigma point {index} was never reported"))
            })
        })
        .collect()
}
