//! Execution of a deployed verifier contract.
//!
//! Mirrors what the exported Solidity does with the BN254 precompiles:
//! reject inputs `≥ r`, fold the inputs into `vk_x = IC₀ + Σ xᵢ·ICᵢ₊₁`, and
//! accept iff `e(−A, B)·e(α, β)·e(vk_x, γ)·e(C, δ) = 1`. Points that are not
//! on the curve or not in the prime-order subgroup make the precompile fail,
//! which reverts the call.

use ark_bn254::{Bn254, G1Affine, G1Projective, G2Affine};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::One;

use hashproof_core::{CallData, ChainCallError, DeploymentError};
use hashproof_groth16::points::{fr_from_biguint, g1_from_evm, g2_from_evm};
use hashproof_groth16::parse_verifier_source;

use crate::gas;

/// A verifier contract as held by the simulated ledger.
#[derive(Debug, Clone)]
pub struct DeployedVerifier {
    alpha: G1Affine,
    beta: G2Affine,
    gamma: G2Affine,
    delta: G2Affine,
    ic: Vec<G1Affine>,
    code_len: usize,
}

fn invalid(e: impl ToString) -> DeploymentError {
    DeploymentError::InvalidSource(e.to_string())
}

fn revert(e: impl ToString) -> ChainCallError {
    ChainCallError::Reverted(e.to_string())
}

impl DeployedVerifier {
    /// "Compile" verifier source: recover and check the embedded key.
    pub fn from_source(source: &str) -> Result<Self, DeploymentError> {
        let k = parse_verifier_source(source).map_err(invalid)?;
        Ok(Self {
            alpha: g1_from_evm(&k.alpha, "alfa1").map_err(invalid)?,
            beta: g2_from_evm(&k.beta, "beta2").map_err(invalid)?,
            gamma: g2_from_evm(&k.gamma, "gamma2").map_err(invalid)?,
            delta: g2_from_evm(&k.delta, "delta2").map_err(invalid)?,
            ic: k
                .ic
                .iter()
                .map(|p| g1_from_evm(p, "IC"))
                .collect::<Result<_, _>>()
                .map_err(invalid)?,
            code_len: source.len(),
        })
    }

    /// Public inputs the entry point takes.
    #[must_use]
    pub fn public_inputs(&self) -> usize {
        self.ic.len().saturating_sub(1)
    }

    /// Size charged for code deposit.
    #[must_use]
    pub const fn code_len(&self) -> usize {
        self.code_len
    }

    /// Gas a call with `payload` consumes.
    #[must_use]
    pub fn gas_for(&self, payload: &[u8]) -> u64 {
        gas::verify_call(payload, self.public_inputs())
    }

    /// Run `verifyProof` on ABI-encoded calldata.
    ///
    /// # Errors
    /// [`ChainCallError::Reverted`] for malformed calldata, inputs outside
    /// the scalar field and invalid points.
    pub fn execute(&self, payload: &[u8]) -> Result<bool, ChainCallError> {
        let call = CallData::abi_decode(payload, self.public_inputs()).map_err(revert)?;

        let inputs = call
            .input
            .iter()
            .map(|x| fr_from_biguint(x).ok_or_else(|| revert("verifier-gte-snark-scalar-field")))
            .collect::<Result<Vec<_>, _>>()?;

        let a = g1_from_evm(&call.a, "a").map_err(revert)?;
        let b = g2_from_evm(&call.b, "b").map_err(revert)?;
        let c = g1_from_evm(&call.c, "c").map_err(revert)?;

        let (ic0, rest) = self
            .ic
            .split_first()
            .ok_or_else(|| revert("verifier-bad-input"))?;
        let mut vk_x: G1Projective = ic0.into_group();
        for (base, x) in rest.iter().zip(&inputs) {
            vk_x += *base * x;
        }

        let out = Bn254::multi_pairing(
            [-a, self.alpha, vk_x.into_affine(), c],
            [b, self.beta, self.gamma, self.delta],
        );
        Ok(out.0.is_one())
    }
}
