//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::DocumentError;

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allowed gap between declared and exact RTP, in percentage points
    pub rtp_tolerance: f64,

    /// Allowed number of tiers between declared and measured volatility
    pub volatility_tolerance: u8,

    /// Spins simulated to measure volatility at publish time
    pub volatility_sample_spins: u64,

    /// Seed for the volatility measurement (validation is deterministic)
    pub volatility_seed: u64,

    /// Master seed for session RNGs; `None` seeds every session from the OS
    pub rng_seed: Option<u64>,

    /// Limits applied to machine documents
    pub limits: DocumentLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rtp_tolerance: 0.5,
            volatility_tolerance: 1,
            volatility_sample_spins: 200_000,
            volatility_seed: 0x5107_7E57,
            rng_seed: None,
            limits: DocumentLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Builder: set master RNG seed
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Builder: set volatility sample size
    pub fn with_volatility_sample(mut self, spins: u64) -> Self {
        self.volatility_sample_spins = spins;
        self
    }

    /// Builder: set RTP tolerance (percentage points)
    pub fn with_rtp_tolerance(mut self, tolerance: f64) -> Self {
        self.rtp_tolerance = tolerance;
        self
    }

    /// Parse JSON configuration
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(|e| DocumentError::Json(e.to_string()))
    }

    /// Parse YAML configuration
    pub fn from_yaml(yaml: &str) -> Result<Self, DocumentError> {
        serde_yml::from_str(yaml).map_err(|e| DocumentError::Yaml(e.to_string()))
    }

    /// Load configuration from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if crate::document::is_yaml_path(path) {
            Self::from_yaml(&text)
        } else {
            Self::from_json(&text)
        }
    }
}

/// Parsing limits for machine documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentLimits {
    pub max_name_length: usize,
    pub max_symbols: usize,
    pub max_reels: usize,
    pub max_rows: usize,
    pub max_paylines: usize,
    pub max_conditions: usize,
    pub max_pay_factor: f64,
}

impl Default for DocumentLimits {
    fn default() -> Self {
        Self {
            max_name_length: 256,
            max_symbols: 64,
            max_reels: 10,
            max_rows: 10,
            max_paylines: 200,
            max_conditions: 256,
            max_pay_factor: 100_000.0,
        }
    }
}
