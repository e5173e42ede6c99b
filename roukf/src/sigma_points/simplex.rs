use nalgebra::{DMatrix, DVector, RealField};

use super::traits::{SigmaPointSet, SigmaPoints};
use super::weights;
use crate::math::ToScalar;

/// Minimal layout: the mean plus the `n + 1` vertices of a regular simplex,
/// `n + 2` equally weighted points in total.
#[derive(Clone, Copy, Debug, Default)]
pub struct Simplex;

/// Vertices of a unit simplex centered at the origin, one per column.
///
/// The `n + 1` columns sum to zero and satisfy
/// `(1 / (n + 1)) Σ σ σᵀ = I`.
pub fn unit_simplex<T: RealField + Copy>(dim: usize) -> DMatrix<T> {
    let mut vertices = DMatrix::zeros(dim, dim + 1);
    let w = T::one() / T::from_count(dim + 1);

    for row in 0..dim {
        let p = T::from_count(row + 1);
        let cw = T::one() / (p * (p + T::one()) * w).sqrt();
        for col in 0..=row {
            vertices[(row, col)] = -cw;
        }
        vertices[(row, row + 1)] = p * cw;
    }
    vertices
}

impl<T: RealField + Copy> SigmaPoints<T> for Simplex {
    fn point_count(&self, dim: usize) -> usize {
        dim + 2
    }

    fn generate(&self, mean: &DVector<T>, sqrt_cov: &DMatrix<T>) -> SigmaPointSet<T> {
        let dim = mean.len();
        assert_eq!(sqrt_cov.shape(), (dim, dim), "factor must be n x n");

        // The center takes weight 1/(n+2); the vertices are stretched so the
        // second moment still matches S Sᵀ.
        let stretch = (T::from_count(dim + 2) / T::from_count(dim + 1)).sqrt();
        let offsets = sqrt_cov * unit_simplex::<T>(dim) * stretch;

        let mut points = DMatrix::zeros(dim, dim + 2);
        points.set_column(0, mean);
        for j in 0..=dim {
            points
                .column_mut(j + 1)
                .copy_from(&(mean + offsets.column(j)));
        }

        SigmaPointSet::new(points, weights::uniform(dim + 2))
    }
}
