//! Chain-client capability.
//!
//! Orchestration code talks to the chain only through [`ChainClient`], so a
//! simulated ledger and a network client are interchangeable.
//!
//! ## Contracts implementors should uphold
//! - `call_verify` returns `Ok(false)` only when the verifier executed and
//!   rejected the proof. Reverts, timeouts and transport failures are
//!   [`ChainCallError`]s.
//! - Calls are never retried internally: whether a resubmission is safe
//!   depends on confirmation state only the caller knows.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calldata::CallData;
use crate::error::{ChainCallError, DeploymentError};

/// Address of a deployed verifier contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractHandle {
    /// 20-byte account address.
    pub address: [u8; 20],
}

impl fmt::Display for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.address))
    }
}

/// Deploys verifier contracts and invokes their verification entry point.
pub trait ChainClient: Send + Sync {
    /// Deploy the verifier described by `verifier_source`.
    ///
    /// # Errors
    /// [`DeploymentError`] is fatal: there is no contract to call.
    fn deploy(&self, verifier_source: &str) -> Result<ContractHandle, DeploymentError>;

    /// Call `verifyProof` on the contract at `handle`.
    ///
    /// # Errors
    /// [`ChainCallError`] when the call does not yield a verification result.
    fn call_verify(&self, handle: &ContractHandle, call: &CallData)
        -> Result<bool, ChainCallError>;
}

impl<C: ChainClient + ?Sized> ChainClient for &C {
    fn deploy(&self, verifier_source: &str) -> Result<ContractHandle, DeploymentError> {
        (**self).deploy(verifier_source)
    }

    fn call_verify(
        &self,
        handle: &ContractHandle,
        call: &CallData,
    ) -> Result<bool, ChainCallError> {
        (**self).call_verify(handle, call)
    }
}
