//! User-supplied operators and the per-sigma-point bridge that runs them.

use nalgebra::RealField;

pub use self::bridge::{OperatorBridge, PointOutcome, PointStatus};

mod bridge;

/// Result reported by a forward operator for one sigma point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorStatus {
    Success,
    Failure,
}

impl OperatorStatus {
    pub fn is_success(self) -> bool {
        self == OperatorStatus::Success
    }
}

impl From<bool> for OperatorStatus {
    fn from(ok: bool) -> Self {
        if ok {
            OperatorStatus::Success
        } else {
            OperatorStatus::Failure
        }
    }
}

/// Advances one sigma point by one step.
///
/// `state` is updated in place. `parameters` arrive in problem space; the
/// operator may adjust them, and the adjusted values are carried forward.
/// Calls for different sigma points may run concurrently, so
/// implementations must not share mutable state.
pub trait ForwardOperator<T: RealField + Copy>: Sync {
    fn forward(&self, state: &mut [T], parameters: &mut [T]) -> OperatorStatus;
}

/// Maps a propagated state to predicted observations.
///
/// The state is read-only; every entry of `observations` must be written.
pub trait ObservationOperator<T: RealField + Copy>: Sync {
    fn observe(&self, state: &[T], observations: &mut [T]);
}

impl<T, F> ForwardOperator<T> for F
where
    T: RealField + Copy,
    F: Fn(&mut [T], &mut [T]) -> OperatorStatus + Sync,
{
    fn forward(&self, state: &mut [T], parameters: &mut [T]) -> OperatorStatus {
        self(state, parameters)
    }
}

impl<T, F> ObservationOperator<T> for F
where
    T: RealField + Copy,
    F: Fn(&[T], &mut [T]) + Sync,
{
    fn observe(&self, state: &[T], observations: &mut [T]) {
        self(state, observations)
    }
}
