//! Distribution of sigma-point propagation over threads and processes.
//!
//! Points are first split across the ranks of a [`Communicator`] and then
//! across the worker threads of each rank. After propagation every rank
//! receives the complete, index-ordered set of outcomes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::operators::PointOutcome;

pub use self::local_group::LocalRank;
pub use self::propagator::{EnsemblePropagator, PropagatedEnsemble};

mod local_group;
mod propagator;

/// How sigma-point indices are dealt out to workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Consecutive blocks whose sizes differ by at most one.
    #[default]
    Contiguous,
    /// Index `i` goes to worker `i mod workers`.
    RoundRobin,
}

impl Partition {
    /// Indices out of `0..count` owned by `worker` among `workers`.
    ///
    /// Over all workers the returned sets are disjoint and cover every index.
    pub fn assign(self, count: usize, workers: usize, worker: usize) -> Vec<usize> {
        let workers = workers.max(1);
        if worker >= workers {
            return Vec::new();
        }
        match self {
            Partition::Contiguous => {
                let base = count / workers;
                let extra = count % workers;
                let start = worker * base + worker.min(extra);
                let len = base + usize::from(worker < extra);
                (start..start + len).collect()
            }
            Partition::RoundRobin => (worker..count).step_by(workers).collect(),
        }
    }
}

/// Collective exchange of sigma-point outcomes between cooperating
/// processes.
///
/// Every rank must call [`all_gather`](Communicator::all_gather) the same
/// number of times, in the same order.
pub trait Communicator<T>: Send {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Contribute the local outcomes and receive those of every rank.
    fn all_gather(&self, local: Vec<PointOutcome<T>>) -> Result<Vec<PointOutcome<T>>>;

    /// Rank 0 owns authoritative reporting.
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// The trivial communicator of a filter running in one process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

impl<T> Communicator<T> for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather(&self, local: Vec<PointOutcome<T>>) -> Result<Vec<PointOutcome<T>>> {
        Ok(local)
    }
}
