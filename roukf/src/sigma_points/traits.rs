use nalgebra::{Cholesky, DMatrix, DVector, DVectorView, RealField};

use crate::error::{FilterError, Result};

/// Sigma points and their weights.
///
/// Each column of `points` is one sigma point in the augmented space. The
/// set is created fresh for every step and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct SigmaPointSet<T: RealField + Copy> {
    points: DMatrix<T>,
    weights: DVector<T>,
}

impl<T: RealField + Copy> SigmaPointSet<T> {
    pub(crate) fn new(points: DMatrix<T>, weights: DVector<T>) -> Self {
        debug_assert_eq!(points.ncols(), weights.len());
        Self { points, weights }
    }

    /// Number of sigma points.
    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.points.ncols() == 0
    }

    /// Dimension of each point.
    pub fn dimension(&self) -> usize {
        self.points.nrows()
    }

    pub fn points(&self) -> &DMatrix<T> {
        &self.points
    }

    pub fn weights(&self) -> &DVector<T> {
        &self.weights
    }

    pub fn point(&self, index: usize) -> DVectorView<'_, T> {
        self.points.column(index)
    }

    /// Weighted sum of the points.
    pub fn weighted_mean(&self) -> DVector<T> {
        let mut mean = DVector::zeros(self.dimension());
        for (i, w) in self.weights.iter().enumerate() {
            mean.axpy(*w, &self.points.column(i), T::one());
        }
        mean
    }

    /// Weighted second central moment of the points.
    pub fn weighted_covariance(&self) -> DMatrix<T> {
        let mean = self.weighted_mean();
        let n = self.dimension();
        let mut cov = DMatrix::zeros(n, n);
        for (i, w) in self.weights.iter().enumerate() {
            let dev = self.points.column(i) - &mean;
            cov.gemm(*w, &dev, &dev.transpose(), T::one());
        }
        cov
    }
}

/// Trait for sigma point generators
pub trait SigmaPoints<T: RealField + Copy> {
    /// Number of sigma points produced for a space of dimension `dim`.
    fn point_count(&self, dim: usize) -> usize;

    /// Generate sigma points from a mean and a square-root factor `S` of
    /// the covariance (`P = S Sᵀ`). `S` need not be triangular.
    fn generate(&self, mean: &DVector<T>, sqrt_cov: &DMatrix<T>) -> SigmaPointSet<T>;

    /// Generate from a full covariance, factorizing it first.
    fn generate_from_covariance(
        &self,
        mean: &DVector<T>,
        covariance: &DMatrix<T>,
    ) -> Result<SigmaPointSet<T>> {
        let chol = Cholesky::new(covariance.clone()).ok_or_else(|| {
            FilterError::InvalidConfiguration("covariance is not positive definite".into())
        })?;
        Ok(self.generate(mean, &chol.l()))
    }
}
