#[cfg(test)]
mod moments {
    use crate::sigma_points::{
        unit_simplex, Canonic, SigmaDistribution, SigmaPoints, Simplex,
    };
    use approx::{abs_diff_eq, assert_relative_eq};
    use nalgebra::{DMatrix, DVector};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPS: f64 = 1e-10;

    /// Random lower-triangular factor with a dominant diagonal.
    fn random_factor(dim: usize, rng: &mut StdRng) -> DMatrix<f64> {
        DMatrix::from_fn(dim, dim, |r, c| {
            if r == c {
                1.0 + rng.gen::<f64>()
            } else if r > c {
                rng.gen_range(-0.5..0.5)
            } else {
                0.0
            }
        })
    }

    fn random_mean(dim: usize, rng: &mut StdRng) -> DVector<f64> {
        DVector::from_fn(dim, |_, _| rng.gen_range(-3.0..3.0))
    }

    fn check_moments(distribution: SigmaDistribution, dim: usize, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mean = random_mean(dim, &mut rng);
        let s = random_factor(dim, &mut rng);
        let set = distribution.generate(&mean, &s);

        assert_eq!(set.len(), distribution.point_count(dim));
        assert_eq!(set.dimension(), dim);
        assert_relative_eq!(set.weights().sum(), 1.0, epsilon = EPS);
        assert!(set.weights().iter().all(|w| *w > 0.0));

        assert_relative_eq!(set.weighted_mean(), mean, epsilon = EPS);
        assert_relative_eq!(set.weighted_covariance(), &s * s.transpose(), epsilon = EPS);
    }

    macro_rules! test_dim {
        ($name:ident, $dim:expr) => {
            #[test]
            fn $name() {
                check_moments(SigmaDistribution::Canonic, $dim, 11 + $dim as u64);
                check_moments(SigmaDistribution::Simplex, $dim, 23 + $dim as u64);
            }
        };
    }

    test_dim!(moments_dim_1, 1);
    test_dim!(moments_dim_2, 2);
    test_dim!(moments_dim_3, 3);
    test_dim!(moments_dim_5, 5);
    test_dim!(moments_dim_8, 8);

    #[test]
    fn point_counts() {
        for n in 1..10 {
            assert_eq!(SigmaDistribution::Canonic.point_count(n), 2 * n + 1);
            assert_eq!(SigmaDistribution::Simplex.point_count(n), n + 2);
            assert_eq!(SigmaPoints::<f64>::point_count(&Canonic::<f64>::default(), n), 2 * n + 1);
            assert_eq!(SigmaPoints::<f64>::point_count(&Simplex, n), n + 2);
        }
    }

    #[test]
    fn canonic_layout() {
        let mean = DVector::from_vec(vec![1.0, -1.0]);
        let s = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 0.5]));
        let set = Canonic::<f64>::default().generate(&mean, &s);
        let c = 2.5f64.sqrt();

        assert_eq!(set.point(0), mean.column(0));
        assert!(abs_diff_eq!(set.points()[(0, 1)], 1.0 + 2.0 * c, epsilon = EPS));
        assert!(abs_diff_eq!(set.points()[(1, 2)], -1.0 + 0.5 * c, epsilon = EPS));
        assert!(abs_diff_eq!(set.points()[(0, 3)], 1.0 - 2.0 * c, epsilon = EPS));
        assert!(abs_diff_eq!(set.points()[(1, 4)], -1.0 - 0.5 * c, epsilon = EPS));
        for w in set.weights().iter() {
            assert_relative_eq!(*w, 0.2, epsilon = 1e-15);
        }
    }

    #[test]
    fn simplex_center_is_first_point() {
        let mut rng = StdRng::seed_from_u64(3);
        let mean = random_mean(4, &mut rng);
        let s = random_factor(4, &mut rng);
        let set = Simplex.generate(&mean, &s);
        assert_eq!(set.point(0), mean.column(0));
    }

    #[test]
    fn unit_simplex_is_centered_and_isotropic() {
        for dim in 1..7 {
            let v = unit_simplex::<f64>(dim);
            assert_eq!(v.shape(), (dim, dim + 1));
            let sums = v.column_sum();
            assert!(sums.iter().all(|s| s.abs() < EPS));
            let second = &v * v.transpose() / (dim as f64 + 1.0);
            assert_relative_eq!(second, DMatrix::identity(dim, dim), epsilon = EPS);
        }
    }

    #[test]
    fn zero_factor_collapses_to_the_mean() {
        let mean = DVector::from_vec(vec![0.3, 0.7, -2.0]);
        let s = DMatrix::zeros(3, 3);
        for distribution in [SigmaDistribution::Canonic, SigmaDistribution::Simplex] {
            let set = distribution.generate(&mean, &s);
            for i in 0..set.len() {
                assert_eq!(set.point(i), mean.column(0));
            }
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(9);
        let mean = random_mean(3, &mut rng);
        let s = random_factor(3, &mut rng);
        for distribution in [SigmaDistribution::Canonic, SigmaDistribution::Simplex] {
            assert_eq!(distribution.generate(&mean, &s), distribution.generate(&mean, &s));
        }
    }

    #[test]
    fn from_full_covariance() {
        let mean = DVector::from_vec(vec![1.0, 2.0]);
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let set = Simplex.generate_from_covariance(&mean, &cov).unwrap();
        assert_relative_eq!(set.weighted_covariance(), cov, epsilon = EPS);

        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(Simplex.generate_from_covariance(&mean, &indefinite).is_err());
    }
}
