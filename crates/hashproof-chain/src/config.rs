//! Simulated-chain parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Block gas limit of the simulated chain.
pub const DEFAULT_GAS_LIMIT: u64 = 8_000_029;

/// Genesis balance of the deployer account, in wei.
pub const DEFAULT_DEPLOYER_BALANCE: u64 = 10_000_000_000;

/// Default wall-clock budget for one verifier call.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Knobs of a [`crate::SimulatedChain`]. Every field has a default, so a
/// partial TOML table is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// Milliseconds before a verifier call is reported as timed out.
    pub call_timeout_ms: u64,
    /// Per-transaction gas limit.
    pub gas_limit: u64,
    /// Starting balance of the deployer account.
    pub deployer_balance: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            gas_limit: DEFAULT_GAS_LIMIT,
            deployer_balance: DEFAULT_DEPLOYER_BALANCE,
        }
    }
}

impl ChainConfig {
    /// Call timeout as a [`Duration`].
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
