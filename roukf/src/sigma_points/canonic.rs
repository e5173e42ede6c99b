use nalgebra::{DMatrix, DVector, RealField};

use super::traits::{SigmaPointSet, SigmaPoints};
use super::weights;
use crate::math::ToScalar;

/// Symmetric layout: the mean plus a positive and a negative point along
/// every column of the square-root factor, `2n + 1` points in total.
///
/// The spread is `sqrt(n + kappa)`. The default `kappa = 1/2` gives every
/// point the weight `1 / (2n + 1)`.
#[derive(Clone, Copy, Debug)]
pub struct Canonic<T: RealField> {
    pub kappa: T,
}

impl<T: RealField> Canonic<T> {
    pub fn new(kappa: T) -> Self {
        Self { kappa }
    }
}

impl<T: RealField + Copy> Default for Canonic<T> {
    fn default() -> Self {
        Self {
            kappa: T::from_constant(0.5),
        }
    }
}

impl<T: RealField + Copy> SigmaPoints<T> for Canonic<T> {
    fn point_count(&self, dim: usize) -> usize {
        2 * dim + 1
    }

    fn generate(&self, mean: &DVector<T>, sqrt_cov: &DMatrix<T>) -> SigmaPointSet<T> {
        let dim = mean.len();
        assert_eq!(sqrt_cov.shape(), (dim, dim), "factor must be n x n");

        let scale = (T::from_count(dim) + self.kappa).sqrt();
        let mut points = DMatrix::zeros(dim, self.point_count(dim));
        points.set_column(0, mean);

        for i in 0..dim {
            let col = sqrt_cov.column(i) * scale;
            points.column_mut(i + 1).copy_from(&(mean + &col));
            points.column_mut(i + 1 + dim).copy_from(&(mean - &col));
        }

        SigmaPointSet::new(points, weights::canonic(dim, self.kappa))
    }
}
