//! Booster Configuration
//!
//! Settings for the boosting driver that runs a distribution strategy.
use crate::constants::{DEFAULT_BAG_FRACTION, DEFAULT_MIN_OBS_IN_NODE, DEFAULT_N_TREES, DEFAULT_SHRINKAGE};
use crate::distribution::DistributionFamily;
use crate::errors::DistributionError;
use crate::utils::validate_float_parameter;
use serde::{Deserialize, Serialize};

fn default_n_trees() -> usize {
    DEFAULT_N_TREES
}
fn default_shrinkage() -> f64 {
    DEFAULT_SHRINKAGE
}
fn default_bag_fraction() -> f64 {
    DEFAULT_BAG_FRACTION
}
fn default_min_obs_in_node() -> usize {
    DEFAULT_MIN_OBS_IN_NODE
}
fn default_log_iterations() -> usize {
    0
}

/// Configuration for the `DistributionBooster`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoosterConfig {
    /// Response family to optimize.
    pub family: DistributionFamily,
    /// Number of boosting iterations.
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    /// Step applied to every fitted tree.
    #[serde(default = "default_shrinkage")]
    pub shrinkage: f64,
    /// Share of training rows drawn into the bag each iteration.
    #[serde(default = "default_bag_fraction")]
    pub bag_fraction: f64,
    /// Terminal nodes with fewer in-bag rows keep a zero adjustment.
    #[serde(default = "default_min_obs_in_node")]
    pub min_obs_in_node: usize,
    /// Seed for bag sampling.
    #[serde(default)]
    pub seed: u64,
    /// Logging frequency (every N iterations), 0 disables it.
    #[serde(default = "default_log_iterations")]
    pub log_iterations: usize,
    /// Number of threads for parallel passes.
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Stop when validation deviance has not improved for this many rounds.
    #[serde(default)]
    pub early_stopping_rounds: Option<usize>,
}

// Default booster base configuration
impl Default for BoosterConfig {
    fn default() -> Self {
        BoosterConfig {
            family: DistributionFamily::Gaussian,
            n_trees: DEFAULT_N_TREES,
            shrinkage: DEFAULT_SHRINKAGE,
            bag_fraction: DEFAULT_BAG_FRACTION,
            min_obs_in_node: DEFAULT_MIN_OBS_IN_NODE,
            seed: 0,
            log_iterations: 0,
            num_threads: None,
            early_stopping_rounds: None,
        }
    }
}

impl BoosterConfig {
    pub fn new(family: DistributionFamily) -> Self {
        BoosterConfig {
            family,
            ..Default::default()
        }
    }

    /// Load a configuration from a json string; missing fields take their defaults.
    pub fn from_json(json_str: &str) -> Result<Self, DistributionError> {
        let config: BoosterConfig = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Dump the configuration as a json string.
    pub fn json_dump(&self) -> Result<String, DistributionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), DistributionError> {
        validate_float_parameter(self.shrinkage, f64::MIN_POSITIVE, 1.0, "shrinkage")?;
        validate_float_parameter(self.bag_fraction, f64::MIN_POSITIVE, 1.0, "bag_fraction")?;
        if self.n_trees == 0 {
            return Err(DistributionError::InvalidParameter(
                "n_trees".to_string(),
                "a positive integer".to_string(),
                self.n_trees.to_string(),
            ));
        }
        if self.min_obs_in_node == 0 {
            return Err(DistributionError::InvalidParameter(
                "min_obs_in_node".to_string(),
                "a positive integer".to_string(),
                self.min_obs_in_node.to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(DistributionError::InvalidParameter(
                "num_threads".to_string(),
                "a positive integer or None".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }

    // Set methods for parameters

    /// Set the number of boosting iterations.
    pub fn set_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the shrinkage applied to each tree.
    pub fn set_shrinkage(mut self, shrinkage: f64) -> Self {
        self.shrinkage = shrinkage;
        self
    }

    /// Set the bag fraction.
    pub fn set_bag_fraction(mut self, bag_fraction: f64) -> Self {
        self.bag_fraction = bag_fraction;
        self
    }

    /// Set the minimum number of in-bag rows per terminal node.
    pub fn set_min_obs_in_node(mut self, min_obs_in_node: usize) -> Self {
        self.min_obs_in_node = min_obs_in_node;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn set_log_iterations(mut self, log_iterations: usize) -> Self {
        self.log_iterations = log_iterations;
        self
    }

    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn set_early_stopping_rounds(mut self, early_stopping_rounds: Option<usize>) -> Self {
        self.early_stopping_rounds = early_stopping_rounds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booster_config_default() {
        let config = BoosterConfig::default();
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.shrinkage, 0.1);
        assert_eq!(config.bag_fraction, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json() {
        let config = BoosterConfig::new(DistributionFamily::Gamma).set_shrinkage(0.05);
        let json = config.json_dump().unwrap();
        let config2 = BoosterConfig::from_json(&json).unwrap();
        assert_eq!(config, config2);

        let partial = r#"{"family": "Poisson", "n_trees": 20}"#;
        let config3 = BoosterConfig::from_json(partial).unwrap();
        assert_eq!(config3.family, DistributionFamily::Poisson);
        assert_eq!(config3.n_trees, 20);
        assert_eq!(config3.min_obs_in_node, 10);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            BoosterConfig::default().set_shrinkage(0.0).validate(),
            Err(DistributionError::InvalidParameter(..))
        ));
        assert!(BoosterConfig::default().set_bag_fraction(1.5).validate().is_err());
        assert!(BoosterConfig::default().set_n_trees(0).validate().is_err());
        assert!(BoosterConfig::default().set_min_obs_in_node(0).validate().is_err());
        assert!(BoosterConfig::default().set_num_threads(Some(0)).validate().is_err());
        assert!(matches!(
            BoosterConfig::from_json(r#"{"family": "Tweedie"}"#),
            Err(DistributionError::Config(_))
        ));
    }
}
