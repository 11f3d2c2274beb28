// src/utils/config.rs
use std::path::PathBuf;

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::blockchain::duplicate::DetectorConfig;
use crate::core::biometric::quantizer::QuantizerParams;
use crate::core::crypto::bch::MAX_CAPACITY;
use crate::core::crypto::extractor::DEFAULT_ERROR_CAPACITY;
use crate::core::identity::aggregator::AggregationPolicy;
use crate::core::identity::did::Network;
use crate::storage::backend::BackendKind;
use crate::utils::error::{IdentityError, Result};

/// Every tunable of the core in one place. Nothing here is global:
/// callers construct services from an explicit `Config` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: Network,
    pub quantizer: QuantizerParams,
    pub extractor: ExtractorConfig,
    pub aggregation: AggregationPolicy,
    pub detector: DetectorConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Correctable bit errors per 127-bit template block.
    pub error_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Root directory; required by the file backend.
    pub path: Option<PathBuf>,
    /// Helper payloads up to this many encoded bytes are embedded inline
    /// in the on-chain record; larger ones go through the backend.
    pub inline_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            quantizer: QuantizerParams::default(),
            extractor: ExtractorConfig {
                error_capacity: DEFAULT_ERROR_CAPACITY,
            },
            aggregation: AggregationPolicy::default(),
            detector: DetectorConfig::default(),
            storage: StorageConfig {
                backend: BackendKind::Memory,
                path: None,
                inline_max_bytes: 1024,
            },
        }
    }
}

impl Config {
    /// Loads configuration layered over the built-in defaults: an
    /// optional `config/default` file, an optional `config/local` file,
    /// then `BIOANCHOR_`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        let config = ConfigLib::builder()
            .add_source(ConfigLib::try_from(&Config::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("BIOANCHOR").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.quantizer.validate()?;
        self.aggregation.validate()?;
        self.detector.validate()?;

        if self.extractor.error_capacity == 0 || self.extractor.error_capacity > MAX_CAPACITY {
            return Err(IdentityError::Config(format!(
                "extractor.error_capacity must be in 1..={}",
                MAX_CAPACITY
            )));
        }
        if self.storage.backend == BackendKind::File && self.storage.path.is_none() {
            return Err(IdentityError::Config(
                "storage.path must be set for the file backend".into(),
            ));
        }
        if self.storage.inline_max_bytes == 0 {
            return Err(IdentityError::Config(
                "storage.inline_max_bytes must be non-zero".into(),
            ));
        }

        Ok(())
    }
}

impl From<ConfigError> for IdentityError {
    fn from(error: ConfigError) -> Self {
        IdentityError::Config(error.to_string())
    }
}
