use log::warn;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn, RealField, SVD};

use super::averaging::WeightedMean;
use crate::error::{FilterError, Result};
use crate::math::{all_finite, ToScalar};
use crate::parallel::PropagatedEnsemble;
use crate::sigma_points::transform::{compress_factor, weighted_deviations};

/// Result of one statistical update.
#[derive(Clone, Debug)]
pub struct KalmanUpdate<T: RealField + Copy> {
    pub mean: DVector<T>,
    pub sqrt_covariance: DMatrix<T>,
    /// Observation minus predicted observation.
    pub innovation: DVector<T>,
    /// Euclidean norm of the innovation.
    pub error: T,
    /// The innovation covariance needed diagonal inflation.
    pub regularized: bool,
}

/// Core update math on the propagated ensemble.
///
/// Given weighted deviations `A` (augmented) and `B` (observations), the
/// cross covariance is `A Bᵀ`, the innovation covariance `B Bᵀ + R` and the
/// gain `K = A Bᵀ (B Bᵀ + R)⁻¹`. The posterior factor is computed without
/// forming `P` so it stays positive semi-definite.
#[derive(Clone, Debug)]
pub struct KalmanUpdateEngine<T: RealField + Copy, WM = super::LinearAveraging> {
    pub(crate) regularization_factor: T,
    pub(crate) averaging: WM,
    pub(crate) y_pred_buffer: DVector<T>,
    pub(crate) z_pred_buffer: DVector<T>,
}

impl<T: RealField + Copy> KalmanUpdateEngine<T> {
    pub fn new(regularization_factor: T) -> Self {
        Self::with_averaging(regularization_factor, super::LinearAveraging)
    }
}

impl<T: RealField + Copy, WM: WeightedMean<T>> KalmanUpdateEngine<T, WM> {
    pub fn with_averaging(regularization_factor: T, averaging: WM) -> Self {
        Self {
            regularization_factor,
            averaging,
            y_pred_buffer: DVector::zeros(0),
            z_pred_buffer: DVector::zeros(0),
        }
    }

    pub fn regularization_factor(&self) -> T {
        self.regularization_factor
    }

    /// Compute the posterior from the propagated ensemble.
    ///
    /// # Arguments
    /// * `ensemble` - propagated points, predicted observations and weights
    /// * `observation` - the measured observation vector
    /// * `observation_noise` - observation error covariance `R`
    ///
    /// Nothing outside the engine's scratch buffers is modified; on error
    /// the caller keeps its previous estimate.
    pub fn update(
        &mut self,
        ensemble: &PropagatedEnsemble<T>,
        observation: &DVector<T>,
        observation_noise: &DMatrix<T>,
    ) -> Result<KalmanUpdate<T>> {
        self.averaging
            .weighted_mean(&ensemble.points, &ensemble.weights, &mut self.y_pred_buffer);
        self.averaging.weighted_mean(
            &ensemble.observations,
            &ensemble.weights,
            &mut self.z_pred_buffer,
        );

        let a = weighted_deviations(&ensemble.points, &self.y_pred_buffer, &ensemble.weights);
        let b = weighted_deviations(
            &ensemble.observations,
            &self.z_pred_buffer,
            &ensemble.weights,
        );

        let pyz = &a * b.transpose();
        let mut pzz = observation_noise.clone_owned();
        pzz.gemm(T::one(), &b, &b.transpose(), T::one());

        let (pzz_cholesky, regularized) = self.factor_innovation(pzz)?;

        let mut gain_t = pyz.transpose();
        pzz_cholesky.solve_mut(&mut gain_t);
        let k_gain = gain_t.transpose();

        let innovation = observation - &self.z_pred_buffer;
        let mean = &self.y_pred_buffer + &k_gain * &innovation;
        let sqrt_covariance = posterior_factor(a, &b, &pzz_cholesky)?;

        if !all_finite(mean.iter()) || !all_finite(sqrt_covariance.iter()) {
            return Err(FilterError::SingularInnovation);
        }

        let error = innovation.norm();
        Ok(KalmanUpdate {
            mean,
            sqrt_covariance,
            innovation,
            error,
            regularized,
        })
    }

    /// Cholesky of the innovation covariance, retried once with the diagonal
    /// inflated by `ε · max(1, tr / m)`.
    fn factor_innovation(&self, pzz: DMatrix<T>) -> Result<(Cholesky<T, Dyn>, bool)> {
        if let Some(ch) = well_conditioned_cholesky(pzz.clone()) {
            return Ok((ch, false));
        }

        let m = pzz.nrows();
        let mean_diag = pzz.trace() / T::from_count(m);
        let inflation = self.regularization_factor * mean_diag.max(T::one());
        warn!(
            "innovation covariance is ill-conditioned, inflating its diagonal by {}",
            inflation
        );

        let regularized = pzz + DMatrix::identity(m, m) * inflation;
        well_conditioned_cholesky(regularized)
            .map(|ch| (ch, true))
            .ok_or(FilterError::SingularInnovation)
    }
}

/// Cholesky factorization that also rejects non-finite input and factors
/// whose diagonal spread exceeds what the scalar type resolves.
fn well_conditioned_cholesky<T: RealField + Copy>(matrix: DMatrix<T>) -> Option<Cholesky<T, Dyn>> {
    if !all_finite(matrix.iter()) {
        return None;
    }
    let chol = Cholesky::new(matrix)?;
    let diag = chol.l_dirty().diagonal();
    if diag.iter().any(|d| !d.is_finite() || *d <= T::zero()) {
        return None;
    }
    let min = diag.iter().fold(diag[0], |acc, d| acc.min(*d));
    let max = diag.iter().fold(diag[0], |acc, d| acc.max(*d));
    let ratio = min / max;
    (ratio * ratio >= T::default_epsilon()).then_some(chol)
}

/// Square-root factor of `A Aᵀ - A Bᵀ (B Bᵀ + R)⁻¹ B Aᵀ`.
///
/// With `C = L⁻¹ B` (`L Lᵀ = B Bᵀ + R`) and the thin SVD `C = U Σ Vᵀ`,
/// the posterior is `A (I - V Σ² Vᵀ) Aᵀ`, and
/// `F = A - A V diag(1 - sqrt(1 - σ²)) Vᵀ` satisfies `F Fᵀ` equal to it.
fn posterior_factor<T: RealField + Copy>(
    a: DMatrix<T>,
    b: &DMatrix<T>,
    pzz_cholesky: &Cholesky<T, Dyn>,
) -> Result<DMatrix<T>> {
    let c = pzz_cholesky
        .l()
        .solve_lower_triangular(b)
        .ok_or(FilterError::SingularInnovation)?;

    if c.iter().all(|v| v.is_zero()) {
        return Ok(compress_factor(a));
    }

    let svd = SVD::try_new(c, false, true, T::default_epsilon(), 0)
        .ok_or(FilterError::SingularInnovation)?;
    let v_t = svd.v_t.ok_or(FilterError::SingularInnovation)?;

    let mut correction = &a * v_t.transpose();
    for (j, sigma) in svd.singular_values.iter().enumerate() {
        let remaining = (T::one() - *sigma * *sigma).max(T::zero());
        correction
            .column_mut(j)
            .scale_mut(T::one() - remaining.sqrt());
    }

    Ok(compress_factor(a - correction * v_t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigma_points::SigmaDistribution;
    use approx::assert_relative_eq;
    use nalgebra::dmatrix;

    /// Ensemble where propagation is the identity and the observation is `H y`.
    fn linear_ensemble(
        distribution: SigmaDistribution,
        mean: &DVector<f64>,
        sqrt_cov: &DMatrix<f64>,
        h: &DMatrix<f64>,
    ) -> PropagatedEnsemble<f64> {
        let set = distribution.generate(mean, sqrt_cov);
        PropagatedEnsemble {
            points: set.points().clone(),
            observations: h * set.points(),
            weights: set.weights().clone(),
            failed: Vec::new(),
            degraded: false,
        }
    }

    #[test]
    fn linear_gaussian_update_matches_closed_form() {
        let mean = DVector::from_vec(vec![1.0, -0.5, 2.0]);
        let sqrt_cov = dmatrix![1.0, 0.0, 0.0;
                                0.3, 0.8, 0.0;
                                -0.2, 0.1, 1.5];
        let h = dmatrix![1.0, 0.0, 0.5;
                         0.0, 2.0, 0.0];
        let r = DMatrix::from_diagonal(&DVector::from_vec(vec![0.1, 0.4]));
        let z = DVector::from_vec(vec![2.5, 0.3]);

        let p = &sqrt_cov * sqrt_cov.transpose();
        let s = &h * &p * h.transpose() + &r;
        let k = &p * h.transpose() * s.clone().try_inverse().unwrap();
        let expected_mean = &mean + &k * (&z - &h * &mean);
        let expected_p = &p - &k * &s * k.transpose();

        for distribution in [SigmaDistribution::Canonic, SigmaDistribution::Simplex] {
            let ensemble = linear_ensemble(distribution, &mean, &sqrt_cov, &h);
            let mut engine = KalmanUpdateEngine::new(1e-9);
            let out = engine.update(&ensemble, &z, &r).unwrap();

            assert_relative_eq!(out.mean, expected_mean, epsilon = 1e-10);
            let posterior = &out.sqrt_covariance * out.sqrt_covariance.transpose();
            assert_relative_eq!(posterior, expected_p, epsilon = 1e-10);
            assert_relative_eq!(out.error, (&z - &h * &mean).norm(), epsilon = 1e-10);
            assert!(!out.regularized);
        }
    }

    #[test]
    fn noise_free_exact_observation_collapses_observed_direction() {
        let mean = DVector::from_vec(vec![0.0, 0.0]);
        let sqrt_cov = DMatrix::identity(2, 2);
        let h = dmatrix![1.0, 0.0];
        let ensemble = linear_ensemble(SigmaDistribution::Canonic, &mean, &sqrt_cov, &h);
        let r = DMatrix::zeros(1, 1);

        let out = KalmanUpdateEngine::new(1e-9)
            .update(&ensemble, &DVector::from_vec(vec![0.7]), &r)
            .unwrap();
        let posterior = &out.sqrt_covariance * out.sqrt_covariance.transpose();
        assert_relative_eq!(out.mean[0], 0.7, epsilon = 1e-12);
        assert!(posterior[(0, 0)].abs() < 1e-12);
        assert_relative_eq!(posterior[(1, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_innovation_is_regularized() {
        let mean = DVector::from_vec(vec![1.0, 2.0]);
        let sqrt_cov = DMatrix::identity(2, 2);
        // observation ignores the state entirely
        let h = DMatrix::zeros(1, 2);
        let ensemble = linear_ensemble(SigmaDistribution::Simplex, &mean, &sqrt_cov, &h);
        let r = DMatrix::zeros(1, 1);

        let out = KalmanUpdateEngine::new(1e-9)
            .update(&ensemble, &DVector::from_vec(vec![3.0]), &r)
            .unwrap();
        assert!(out.regularized);
        assert_relative_eq!(out.mean, mean, epsilon = 1e-12);
        assert_relative_eq!(out.error, 3.0, epsilon = 1e-12);
        let posterior = &out.sqrt_covariance * out.sqrt_covariance.transpose();
        assert_relative_eq!(posterior, DMatrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn overflowing_innovation_is_singular() {
        let mean = DVector::from_vec(vec![1.0]);
        let sqrt_cov = DMatrix::identity(1, 1);
        let h = dmatrix![1e200];
        let ensemble = linear_ensemble(SigmaDistribution::Canonic, &mean, &sqrt_cov, &h);
        let r = DMatrix::identity(1, 1);

        let err = KalmanUpdateEngine::new(1e-9)
            .update(&ensemble, &DVector::from_vec(vec![0.0]), &r)
            .unwrap_err();
        assert!(matches!(err, FilterError::SingularInnovation));
    }

    #[test]
    fn conditioning_check() {
        assert!(well_conditioned_cholesky(dmatrix![4.0, 0.0; 0.0, 1.0]).is_some());
        assert!(well_conditioned_cholesky(dmatrix![1.0, 0.0; 0.0, 0.0]).is_none());
        assert!(well_conditioned_cholesky(dmatrix![1.0, 0.0; 0.0, 1e-40]).is_none());
        assert!(well_conditioned_cholesky(dmatrix![f64::NAN]).is_none());
    }
}
