//! Statistical update of the augmented state.

pub mod averaging;
pub mod engine;

pub use averaging::{LinearAveraging, WeightedMean};
pub use engine::{KalmanUpdate, KalmanUpdateEngine};
