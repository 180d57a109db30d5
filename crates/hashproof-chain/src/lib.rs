//! hashproof-chain: an in-process simulated EVM chain.
//!
//! [`SimulatedChain`] implements [`hashproof_core::ChainClient`] for the
//! Groth16 verifiers exported by `hashproof-groth16`:
//!
//! - **deploy** parses the verifier source, charges creation gas to a
//!   single funded deployer account and derives the contract address from
//!   `keccak256(deployer ‖ nonce)`;
//! - **call_verify** ABI-encodes the call, checks the gas limit, and runs
//!   the verifier on a worker thread bounded by the configured timeout.
//!
//! Calls are view calls: they cost gas against the limit but no balance.
//! Nothing is ever retried.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]

/// Chain parameters.
pub mod config;
/// Gas schedule.
pub mod gas;
/// Verifier contract execution.
pub mod verifier;

use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, RwLock};
use std::thread;
use tracing::{debug, info, warn};

use hashproof_core::{CallData, ChainCallError, ChainClient, ContractHandle, DeploymentError};

pub use config::{ChainConfig, DEFAULT_DEPLOYER_BALANCE, DEFAULT_GAS_LIMIT};
pub use verifier::DeployedVerifier;

#[derive(Debug)]
struct Ledger {
    nonce: u64,
    balance: u128,
    contracts: HashMap<[u8; 20], Arc<DeployedVerifier>>,
}

/// Simulated chain with one funded deployer account.
#[derive(Debug)]
pub struct SimulatedChain {
    config: ChainConfig,
    deployer: [u8; 20],
    ledger: RwLock<Ledger>,
}

fn address_tail(hash: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..32]);
    out
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl SimulatedChain {
    /// Fresh chain at genesis.
    #[must_use]
    pub fn new(config: ChainConfig) -> Self {
        let deployer = address_tail(&Keccak256::digest(b"hashproof-deployer"));
        info!(
            deployer = %hex::encode(deployer),
            balance = config.deployer_balance,
            gas_limit = config.gas_limit,
            "simulated chain started"
        );
        Self {
            ledger: RwLock::new(Ledger {
                nonce: 0,
                balance: u128::from(config.deployer_balance),
                contracts: HashMap::new(),
            }),
            config,
            deployer,
        }
    }

    /// Chain parameters.
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Deployer account address.
    #[must_use]
    pub const fn deployer(&self) -> [u8; 20] {
        self.deployer
    }

    /// Remaining deployer balance, if the ledger is readable.
    #[must_use]
    pub fn deployer_balance(&self) -> Option<u128> {
        self.ledger.read().ok().map(|l| l.balance)
    }

    /// Number of deployed contracts, if the ledger is readable.
    #[must_use]
    pub fn contract_count(&self) -> Option<usize> {
        self.ledger.read().ok().map(|l| l.contracts.len())
    }

    fn contract_address(&self, nonce: u64) -> [u8; 20] {
        let mut h = Keccak256::new();
        h.update(self.deployer);
        h.update(nonce.to_be_bytes());
        address_tail(&h.finalize())
    }

    fn lookup(&self, handle: &ContractHandle) -> Result<Arc<DeployedVerifier>, ChainCallError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| ChainCallError::Backend("ledger lock poisoned".into()))?;
        ledger
            .contracts
            .get(&handle.address)
            .cloned()
            .ok_or_else(|| ChainCallError::UnknownContract(handle.to_string()))
    }
}

impl ChainClient for SimulatedChain {
    fn deploy(&self, verifier_source: &str) -> Result<ContractHandle, DeploymentError> {
        let contract = DeployedVerifier::from_source(verifier_source)?;
        let cost = gas::deployment(contract.code_len());
        if cost > self.config.gas_limit {
            return Err(DeploymentError::Rejected(format!(
                "out of gas: deployment needs {cost}, limit {}",
                self.config.gas_limit
            )));
        }

        let mut ledger = self
            .ledger
            .write()
            .map_err(|_| DeploymentError::Rejected("ledger lock poisoned".into()))?;
        let fee = u128::from(cost);
        if fee > ledger.balance {
            return Err(DeploymentError::Rejected(format!(
                "insufficient funds: need {fee}, have {}",
                ledger.balance
            )));
        }
        let address = self.contract_address(ledger.nonce);
        ledger.nonce += 1;
        ledger.balance -= fee;
        ledger.contracts.insert(address, Arc::new(contract));

        let handle = ContractHandle { address };
        info!(contract = %handle, gas = cost, "verifier deployed");
        Ok(handle)
    }

    fn call_verify(
        &self,
        handle: &ContractHandle,
        call: &CallData,
    ) -> Result<bool, ChainCallError> {
        let contract = self.lookup(handle)?;
        let payload = call
            .abi_encode()
            .map_err(|e| ChainCallError::InvalidCallData(e.to_string()))?;

        let gas = contract.gas_for(&payload);
        if gas > self.config.gas_limit {
            warn!(gas, limit = self.config.gas_limit, "verifier call out of gas");
            return Err(ChainCallError::Reverted(format!(
                "out of gas: call needs {gas}, limit {}",
                self.config.gas_limit
            )));
        }
        debug!(contract = %handle, gas, bytes = payload.len(), "calling verifyProof");

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("evm-call".into())
            .spawn(move || {
                let _ = tx.send(contract.execute(&payload));
            })
            .map_err(|e| ChainCallError::Backend(format!("cannot start call worker: {e}")))?;

        let timeout = self.config.call_timeout();
        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(contract = %handle, ?timeout, "verifier call timed out");
                Err(ChainCallError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ChainCallError::Backend(
                "call worker exited without a result".into(),
            )),
        }
    }
}
