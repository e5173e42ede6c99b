//! Reduced-order unscented Kalman filtering for joint state and parameter
//! estimation.
//!
//! The filter estimates an augmented vector `[state; parameters]` of a
//! user-supplied forward model from a sequence of observations. The model
//! is only ever evaluated through two operators: a forward operator that
//! advances one sigma point and an observation operator that predicts the
//! measurements of a propagated state.
//!
//! ```
//! use roukf::{FilterSetup, OperatorStatus, RoukfFilter, SigmaDistribution};
//!
//! // x' = a x, observed directly; estimate a.
//! let setup = FilterSetup::new(1, 1, 1, vec![1.0], vec![10.0], SigmaDistribution::Canonic)
//!     .with_observation_uncertainty(vec![1e-4]);
//! let mut filter = RoukfFilter::new(setup).unwrap();
//! filter.set_state(&[1.0]).unwrap();
//!
//! let forward = |x: &mut [f64], a: &mut [f64]| {
//!     x[0] *= a[0];
//!     OperatorStatus::Success
//! };
//! let observe = |x: &[f64], z: &mut [f64]| z[0] = x[0];
//!
//! for t in 0..30 {
//!     let truth = 0.9f64.powi(t + 1);
//!     filter.execute_step(&[truth], &forward, &observe).unwrap();
//! }
//! assert!((filter.parameters().unwrap()[0] - 0.9).abs() < 1e-2);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod kf;
pub mod mapping;
pub mod math;
pub mod operators;
pub mod parallel;
pub mod sigma_points;
pub mod state;

pub use config::FilterConfig;
pub use error::{FilterError, Quantity, Result};
pub use filter::{
    Convergence, FailurePolicy, FilterOptions, FilterPhase, FilterSetup, RoukfFilter, StepStatus,
};
pub use mapping::{
    CompositeMapper, ExponentialMapper, IdentityMapper, ParameterMapper, SigmoidMapper,
};
pub use operators::{ForwardOperator, ObservationOperator, OperatorStatus};
pub use parallel::{Communicator, LocalRank, Partition, SingleProcess};
pub use sigma_points::SigmaDistribution;
pub use state::Dimensions;
