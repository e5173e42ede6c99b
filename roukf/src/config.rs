//! JSON description of a filter run.
//!
//! ```json
//! {
//!   "states": 1,
//!   "parameters": 1,
//!   "observations": 1,
//!   "initial_state": [1.0],
//!   "initial_guess": [0.5],
//!   "state_uncertainty": [1.0],
//!   "parameter_uncertainty": [10.0],
//!   "parameter_mapping": [{ "type": "exponential", "count": 1 }],
//!   "observation_values": [0.9],
//!   "observation_uncertainty": [1e-4],
//!   "sigma_distribution": "canonic",
//!   "options": { "convergence_tolerance": 1e-8, "max_iterations": 200 }
//! }
//! ```
//!
//! Omitted initial values start at zero (state) or at the mapper's image of
//! zero (parameters). Omitted state uncertainty is zero for every state.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Quantity, Result};
use crate::filter::{FilterOptions, FilterSetup, RoukfFilter};
use crate::mapping::{CompositeMapper, ExponentialMapper, IdentityMapper, SigmoidMapper};
use crate::sigma_points::SigmaDistribution;
use crate::state::check_len;

/// One block of the parameter mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MappingBlock {
    Identity { count: usize },
    Exponential { count: usize },
    Sigmoid { count: usize, min: f64, max: f64 },
}

impl MappingBlock {
    pub fn count(&self) -> usize {
        match self {
            MappingBlock::Identity { count }
            | MappingBlock::Exponential { count }
            | MappingBlock::Sigmoid { count, .. } => *count,
        }
    }
}

fn default_distribution() -> SigmaDistribution {
    SigmaDistribution::Simplex
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub states: usize,
    pub parameters: usize,
    pub observations: usize,
    #[serde(default)]
    pub initial_state: Vec<f64>,
    /// Initial parameters in problem space.
    #[serde(default)]
    pub initial_guess: Vec<f64>,
    #[serde(default)]
    pub state_uncertainty: Vec<f64>,
    pub parameter_uncertainty: Vec<f64>,
    #[serde(default)]
    pub parameter_mapping: Vec<MappingBlock>,
    /// A fixed observation vector for runs that repeat one measurement.
    #[serde(default)]
    pub observation_values: Vec<f64>,
    pub observation_uncertainty: Vec<f64>,
    #[serde(default = "default_distribution")]
    pub sigma_distribution: SigmaDistribution,
    #[serde(default)]
    pub options: FilterOptions,
}

impl FilterConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        info!("loaded filter configuration from {}", path.display());
        Ok(config)
    }

    /// Composite mapper described by `parameter_mapping`, `None` when the
    /// list is empty.
    pub fn mapper(&self) -> Result<Option<CompositeMapper<f64>>> {
        if self.parameter_mapping.is_empty() {
            return Ok(None);
        }
        let mut mapper = CompositeMapper::new();
        for block in &self.parameter_mapping {
            match *block {
                MappingBlock::Identity { count } => {
                    mapper.push_block(count, Box::new(IdentityMapper))
                }
                MappingBlock::Exponential { count } => {
                    mapper.push_block(count, Box::new(ExponentialMapper))
                }
                MappingBlock::Sigmoid { count, min, max } => {
                    let sigmoid = SigmoidMapper::new(min, max).ok_or_else(|| {
                        FilterError::InvalidConfiguration(format!(
                            "sigmoid bounds must satisfy min < max, got [{min}, {max}]"
                        ))
                    })?;
                    mapper.push_block(count, Box::new(sigmoid))
                }
            }
        }
        check_len(Quantity::Mapper, self.parameters, mapper.len())?;
        Ok(Some(mapper))
    }

    pub fn setup(&self) -> FilterSetup<f64> {
        let state_uncertainty = if self.state_uncertainty.is_empty() {
            vec![0.0; self.states]
        } else {
            self.state_uncertainty.clone()
        };
        FilterSetup::new(
            self.observations,
            self.states,
            self.parameters,
            state_uncertainty,
            self.parameter_uncertainty.clone(),
            self.sigma_distribution,
        )
        .with_observation_uncertainty(self.observation_uncertainty.clone())
    }

    /// Build a ready filter with mapping and initial values applied.
    pub fn build(&self) -> Result<RoukfFilter<f64>> {
        let mut filter = RoukfFilter::new(self.setup())?.with_options(self.options.clone())?;
        if let Some(mapper) = self.mapper()? {
            filter = filter.with_parameter_mapper(mapper)?;
        }
        if !self.initial_state.is_empty() {
            filter.set_state(&self.initial_state)?;
        }
        if !self.initial_guess.is_empty() {
            filter.set_parameters(&self.initial_guess)?;
        }
        Ok(filter)
    }

    /// The configured observation vector, checked against `observations`.
    pub fn observations(&self) -> Result<&[f64]> {
        check_len(
            Quantity::Observations,
            self.observations,
            self.observation_values.len(),
        )?;
        Ok(&self.observation_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FailurePolicy, FilterPhase};
    use approx::assert_relative_eq;

    const JSON: &str = r#"{
        "states": 2,
        "parameters": 3,
        "observations": 1,
        "initial_state": [1.0, 2.0],
        "initial_guess": [0.5, 2.0, 0.25],
        "state_uncertainty": [0.1, 0.1],
        "parameter_uncertainty": [1.0, 1.0, 1.0],
        "parameter_mapping": [
            { "type": "identity", "count": 1 },
            { "type": "exponential", "count": 1 },
            { "type": "sigmoid", "count": 1, "min": 0.0, "max": 1.0 }
        ],
        "observation_values": [0.3],
        "observation_uncertainty": [0.01],
        "sigma_distribution": "canonic",
        "options": { "failure_policy": "report_degraded", "max_iterations": 50 }
    }"#;

    #[test]
    fn parses_and_builds() {
        let config = FilterConfig::from_json_str(JSON).unwrap();
        assert_eq!(config.sigma_distribution, SigmaDistribution::Canonic);
        assert_eq!(config.options.failure_policy, FailurePolicy::ReportDegraded);
        assert_eq!(config.options.max_iterations, 50);
        assert_eq!(config.options.convergence_tolerance, 1e-5);
        assert_eq!(config.parameter_mapping[2].count(), 1);

        let filter = config.build().unwrap();
        assert_eq!(filter.phase(), FilterPhase::Ready);
        assert_eq!(filter.sigma_point_count().unwrap(), 11);
        assert_eq!(filter.state().unwrap(), vec![1.0, 2.0]);
        let p = filter.parameters().unwrap();
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-14);
        assert_relative_eq!(p[1], 2.0, epsilon = 1e-14);
        assert_relative_eq!(p[2], 0.25, epsilon = 1e-14);
        assert_eq!(config.observations().unwrap(), &[0.3]);
    }

    #[test]
    fn defaults_for_optional_fields() {
        let config = FilterConfig::from_json_str(
            r#"{ "states": 1, "parameters": 1, "observations": 1,
                 "parameter_uncertainty": [2.0], "observation_uncertainty": [1.0] }"#,
        )
        .unwrap();
        assert_eq!(config.sigma_distribution, SigmaDistribution::Simplex);
        assert!(config.mapper().unwrap().is_none());
        let filter = config.build().unwrap();
        assert_eq!(filter.sigma_point_count().unwrap(), 4);
        let cov = filter.covariance().unwrap();
        assert_eq!(cov[(0, 0)], 0.0);
        assert_relative_eq!(cov[(1, 1)], 2.0, epsilon = 1e-14);
        assert!(config.observations().is_err());
    }

    #[test]
    fn mapping_must_cover_parameters() {
        let mut config = FilterConfig::from_json_str(JSON).unwrap();
        config.parameter_mapping.pop();
        assert!(matches!(
            config.build(),
            Err(FilterError::DimensionMismatch {
                quantity: Quantity::Mapper,
                ..
            })
        ));
    }

    #[test]
    fn initial_guess_outside_mapping_domain() {
        let mut config = FilterConfig::from_json_str(JSON).unwrap();
        config.initial_guess[2] = 1.5;
        assert!(matches!(
            config.build(),
            Err(FilterError::InvalidParameter { index: 2, .. })
        ));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            FilterConfig::from_json_str(r#"{ "states": "two" }"#),
            Err(FilterError::Json(_))
        ));
        assert!(matches!(
            FilterConfig::from_path("/nonexistent/roukf.json"),
            Err(FilterError::Io(_))
        ));
    }
}
