//! Weighted averaging of propagated sigma points
//!
//! The update reduces the propagated ensemble through this trait, so a
//! different averaging rule can be substituted without touching the
//! engine.

use nalgebra::{DMatrix, DVector, RealField};

/// Trait for computing weighted averages of sigma points.
pub trait WeightedMean<T: RealField + Copy>: Clone {
    /// Compute the weighted mean of sigma points.
    ///
    /// # Arguments
    /// * `sigma_points` - Matrix where each column is a sigma point
    /// * `weights` - Vector of weights for each sigma point
    /// * `output` - Buffer for the result, resized when needed
    fn weighted_mean(&self, sigma_points: &DMatrix<T>, weights: &DVector<T>, output: &mut DVector<T>);
}

/// Linear averaging for Euclidean spaces (default).
///
/// This implements the standard linear weighted sum:
/// mean = Σ(w_i * x_i)
#[derive(Clone, Debug, Default)]
pub struct LinearAveraging;

impl<T: RealField + Copy> WeightedMean<T> for LinearAveraging {
    fn weighted_mean(&self, sigma_points: &DMatrix<T>, weights: &DVector<T>, output: &mut DVector<T>) {
        if output.len() != sigma_points.nrows() {
            *output = DVector::zeros(sigma_points.nrows());
        } else {
            output.fill(T::zero());
        }

        let n_sigmas = sigma_points.ncols().min(weights.len());
        for i in 0..n_sigmas {
            output.axpy(weights[i], &sigma_points.column(i), T::one());
        }
    }
}
