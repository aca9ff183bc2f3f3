//! Simulation configuration loaded from TOML.
//!
//! ```toml
//! n-bits = 1000
//! channel-error-rate = 0.05
//! eavesdropper = true
//! seed = 42
//! backend = "probabilistic"
//! noise-model = "encoded-bit-flip"
//! parallel = false
//! trials = 10
//! ```

use crate::backend::{BackendKind, NoiseModel};
use crate::errors::ProtocolError;
use crate::protocols::bb84::Bb84Params;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ProtocolError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SimulationConfig {
    pub n_bits: usize,
    pub channel_error_rate: f64,
    pub eavesdropper: bool,
    /// Fixed seed for reproducible runs; drawn from the OS when absent.
    pub seed: Option<u64>,
    pub backend: BackendKind,
    pub noise_model: NoiseModel,
    pub parallel: bool,
    /// Number of independent runs to average over.
    pub trials: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_bits: 1000,
            channel_error_rate: 0.05,
            eavesdropper: false,
            seed: None,
            backend: BackendKind::default(),
            noise_model: NoiseModel::default(),
            parallel: false,
            trials: 1,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ProtocolError::invalid("trials", "must be positive").into());
        }
        self.params()?;
        Ok(())
    }

    /// Protocol parameters described by this config.
    pub fn params(&self) -> Result<Bb84Params, ProtocolError> {
        Ok(
            Bb84Params::new(self.n_bits, self.channel_error_rate, self.eavesdropper)?
                .with_noise_model(self.noise_model),
        )
    }
}
