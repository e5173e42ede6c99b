//! Square-root moment helpers used by the update.

use nalgebra::{DMatrix, DVector, RealField};

/// Deviations from `mean`, each column scaled by the square root of its weight.
///
/// For the result `A`, `A Aᵀ` is the weighted covariance of `points`.
pub fn weighted_deviations<T: RealField + Copy>(
    points: &DMatrix<T>,
    mean: &DVector<T>,
    weights: &DVector<T>,
) -> DMatrix<T> {
    let mut dev = DMatrix::zeros(points.nrows(), points.ncols());
    for i in 0..points.ncols() {
        let f = weights[i].sqrt();
        let mut col = dev.column_mut(i);
        col.copy_from(&(points.column(i) - mean));
        col.scale_mut(f);
    }
    dev
}

/// Reduce an `n x k` factor `F` to an `n x n` factor with the same `F Fᵀ`.
///
/// Uses the QR decomposition of `Fᵀ`; when `k < n` the missing columns are
/// zero.
pub fn compress_factor<T: RealField + Copy>(factor: DMatrix<T>) -> DMatrix<T> {
    let n = factor.nrows();
    let r_mat = factor.transpose().qr().r();
    let mut sqrt_cov = DMatrix::zeros(n, n);
    sqrt_cov
        .columns_mut(0, r_mat.nrows())
        .copy_from(&r_mat.transpose());
    sqrt_cov
}

/// Weighted mean and square-root covariance of a set of points.
pub fn unscented_transform<T: RealField + Copy>(
    points: &DMatrix<T>,
    weights: &DVector<T>,
) -> (DVector<T>, DMatrix<T>) {
    let mut mean = DVector::zeros(points.nrows());
    for i in 0..points.ncols() {
        mean.axpy(weights[i], &points.column(i), T::one());
    }
    let dev = weighted_deviations(points, &mean, weights);
    (mean, compress_factor(dev))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dmatrix;

    #[test]
    fn compressed_factor_keeps_product() {
        let f = dmatrix![1.0, 2.0, 0.5, -1.0;
                         0.0, 1.0, 3.0, 2.0;
                         4.0, -2.0, 1.0, 0.0];
        let expected = &f * f.transpose();
        let s = compress_factor(f);
        assert_eq!(s.shape(), (3, 3));
        assert_relative_eq!(&s * s.transpose(), expected, epsilon = 1e-12);
    }

    #[test]
    fn narrow_factor_is_padded() {
        let f = dmatrix![1.0; 2.0; 3.0];
        let expected = &f * f.transpose();
        let s = compress_factor(f);
        assert_eq!(s.shape(), (3, 3));
        assert_relative_eq!(&s * s.transpose(), expected, epsilon = 1e-12);
    }

    #[test]
    fn transform_of_symmetric_pair() {
        let pts = dmatrix![1.0, 3.0;
                           -1.0, 1.0];
        let w = DVector::from_vec(vec![0.5, 0.5]);
        let (mean, s) = unscented_transform(&pts, &w);
        assert_relative_eq!(mean, DVector::from_vec(vec![2.0, 0.0]), epsilon = 1e-14);
        let p = &s * s.transpose();
        assert_relative_eq!(p[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[(1, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[(0, 1)], 1.0, epsilon = 1e-12);
    }
}
