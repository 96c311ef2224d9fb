//! Experiment settings, optionally loaded from a TOML file and then
//! overridden by command-line flags.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::neural_net::InitMethod;
use crate::model::optimizer::DEFAULT_LEARNING_RATE;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Number of passes over the training slice.
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Rows per weight update.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// RMSprop step size.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Number of leading training rows held out for validation.
    #[serde(default = "default_validation_size")]
    pub validation_size: usize,

    /// Vocabulary size; also the width of the feature vectors.
    #[serde(default = "default_num_words")]
    pub num_words: usize,

    /// L1 coefficient of the L1+L2 variant.
    #[serde(default = "default_coefficient")]
    pub l1: f32,

    /// L2 coefficient of the L2 and L1+L2 variants.
    #[serde(default = "default_coefficient")]
    pub l2: f32,

    /// Shuffle the training rows before every epoch.
    #[serde(default)]
    pub shuffle: bool,

    /// Seed for weight initialization and shuffling.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_init")]
    pub initialization: InitMethod,
}

fn default_epochs() -> usize {
    20
}
fn default_batch_size() -> usize {
    512
}
fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}
fn default_validation_size() -> usize {
    10_000
}
fn default_num_words() -> usize {
    10_000
}
fn default_coefficient() -> f32 {
    0.001
}
fn default_init() -> InitMethod {
    InitMethod::Xavier
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            validation_size: default_validation_size(),
            num_words: default_num_words(),
            l1: default_coefficient(),
            l2: default_coefficient(),
            shuffle: false,
            seed: None,
            initialization: default_init(),
        }
    }
}

impl ExperimentConfig {
    /// Load a config from a TOML file. Missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ExperimentConfig = toml::from_str(&contents)?;
        tracing::info!(path = %path.display(), "Loaded experiment config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(
                "learning_rate must be finite and > 0".to_string(),
            ));
        }
        if self.num_words == 0 {
            return Err(Error::InvalidConfig("num_words must be > 0".to_string()));
        }
        for (name, value) in [("l1", self.l1), ("l2", self.l2)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}
