//! Recombination weights shared by the sigma-point generators.
//!
//! Both layouts use one weight per point for the mean and the covariance.

use nalgebra::{DVector, RealField};

use crate::math::ToScalar;

/// Equal weights `1 / count`.
pub fn uniform<T: RealField + Copy>(count: usize) -> DVector<T> {
    DVector::from_element(count, T::one() / T::from_count(count))
}

/// Weights of the canonic layout with spread `kappa`.
///
/// The center carries `kappa / (n + kappa)` and every axis point
/// `1 / (2 (n + kappa))`. With `kappa = 1/2` every weight equals
/// `1 / (2n + 1)`.
pub fn canonic<T: RealField + Copy>(dim: usize, kappa: T) -> DVector<T> {
    let n = T::from_count(dim);
    let n_kappa = n + kappa;
    let two = T::one() + T::one();
    let mut weights = DVector::from_element(2 * dim + 1, T::one() / (two * n_kappa));
    weights[0] = kappa / n_kappa;
    weights
}

/// Restrict `weights` to the points flagged in `keep` and rescale them to
/// sum to one. Returns `None` when nothing with positive weight is kept.
pub fn renormalized<T: RealField + Copy>(weights: &DVector<T>, keep: &[bool]) -> Option<DVector<T>> {
    let kept: Vec<T> = weights
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(w, _)| *w)
        .collect();
    let total = kept.iter().fold(T::zero(), |acc, w| acc + *w);
    if kept.is_empty() || !(total > T::zero()) {
        return None;
    }
    Some(DVector::from_iterator(kept.len(), kept.into_iter().map(|w| w / total)))
}
