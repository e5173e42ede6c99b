//! Sigma-point generators for the augmented state

use nalgebra::{DMatrix, DVector, RealField};
use serde::{Deserialize, Serialize};

pub use self::canonic::Canonic;
pub use self::simplex::{unit_simplex, Simplex};
pub use self::traits::{SigmaPointSet, SigmaPoints};

mod canonic;
mod simplex;

#[cfg(test)]
mod tests;

mod traits;

pub mod transform;
pub mod weights;
pub use transform::unscented_transform;

/// Sigma-point layout selected when the filter is set up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigmaDistribution {
    /// `2n + 1` symmetric points.
    Canonic,
    /// `n + 2` simplex points.
    Simplex,
}

impl SigmaDistribution {
    pub fn point_count(self, dim: usize) -> usize {
        match self {
            SigmaDistribution::Canonic => 2 * dim + 1,
            SigmaDistribution::Simplex => dim + 2,
        }
    }

    pub fn generate<T: RealField + Copy>(
        self,
        mean: &DVector<T>,
        sqrt_cov: &DMatrix<T>,
    ) -> SigmaPointSet<T> {
        match self {
            SigmaDistribution::Canonic => Canonic::default().generate(mean, sqrt_cov),
            SigmaDistribution::Simplex => Simplex.generate(mean, sqrt_cov),
        }
    }
}
