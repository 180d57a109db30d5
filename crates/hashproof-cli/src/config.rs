//! Run configuration: TOML file, then command-line overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use hashproof_chain::ChainConfig;

/// Everything a run needs besides the mode flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding `<circuit>.r1cs`, `.pk`, `.vk` and the verifier source.
    pub artifacts_dir: PathBuf,
    /// Artifact file stem.
    pub circuit: String,
    /// MiMC round-constant seed.
    pub seed: String,
    /// Preimage, read as big-endian bytes.
    pub secret: String,
    /// Public input used to demonstrate rejection.
    pub bogus_input: u64,
    /// Simulated chain parameters.
    pub chain: ChainConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("circuit"),
            circuit: "hash".to_owned(),
            seed: "seed".to_owned(),
            secret: "secret".to_owned(),
            bogus_input: 42,
            chain: ChainConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Parse TOML text; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
