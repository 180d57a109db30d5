//! Proving-system abstraction.
//!
//! The proving algorithm (constraint compilation, trusted setup, Groth16
//! prove/verify math) lives behind [`ProvingSystem`]. Everything in this
//! crate is generic over it.
//!
//! ## Contracts implementors should uphold
//! - `setup` draws fresh randomness on every call; two runs over the same
//!   constraint system yield unrelated key pairs.
//! - `prove` must return [`Error::UnsatisfiedConstraint`] (not a proof) when
//!   the witness does not satisfy the constraint system it is given.
//! - `verify` must return [`Error::PublicInputArityMismatch`] (not `false`)
//!   when the input count does not match the verifying key; see
//!   [`check_arity`].
//! - `proof_bytes` must produce a stream matching `proof_layout`.
//! - Neither function should panic for malformed inputs; return `Err` instead.

use num_bigint::BigUint;

use crate::artifact::Artifact;
use crate::descriptor::{CircuitDescriptor, Curve};
use crate::error::{Error, SetupError};
use crate::field::FieldElement;
use crate::marshal::ProofLayout;
use crate::witness::Witness;

/// Compile / setup / prove / verify capability for one curve.
pub trait ProvingSystem: Send + Sync {
    /// Compiled relation.
    type ConstraintSystem: Artifact + Send + Sync;
    /// Proving key.
    type ProvingKey: Artifact + Send + Sync;
    /// Verifying key.
    type VerifyingKey: Artifact + Send + Sync;
    /// Proof object.
    type Proof: Clone + Send + Sync;

    /// Curve the system operates on.
    fn curve(&self) -> Curve;

    /// Scalar-field modulus that bounds witness values and public inputs.
    fn scalar_modulus(&self) -> BigUint;

    /// Layout of [`Self::proof_bytes`] streams.
    fn proof_layout(&self) -> ProofLayout;

    /// Compile `descriptor` into a constraint system over `curve`.
    ///
    /// # Errors
    /// [`SetupError::InvalidConstraint`] if the descriptor cannot be realized,
    /// [`SetupError::UnsupportedCurve`] if `curve` is not this system's curve.
    fn compile(
        &self,
        descriptor: &CircuitDescriptor,
        curve: Curve,
    ) -> Result<Self::ConstraintSystem, SetupError>;

    /// Run the trusted setup for `cs`.
    fn setup(
        &self,
        cs: &Self::ConstraintSystem,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey), SetupError>;

    /// Hash `secret` with the function the constraint system encodes.
    fn digest(
        &self,
        cs: &Self::ConstraintSystem,
        secret: &FieldElement,
    ) -> Result<FieldElement, Error>;

    /// Produce a proof that `witness` satisfies `cs`.
    fn prove(
        &self,
        cs: &Self::ConstraintSystem,
        pk: &Self::ProvingKey,
        witness: &Witness,
    ) -> Result<Self::Proof, Error>;

    /// Check `proof` against `vk` and `public_inputs`.
    fn verify(
        &self,
        proof: &Self::Proof,
        vk: &Self::VerifyingKey,
        public_inputs: &[FieldElement],
    ) -> Result<bool, Error>;

    /// Number of public inputs declared by `vk`.
    fn public_input_count(&self, vk: &Self::VerifyingKey) -> usize;

    /// Raw serialized proof stream (see [`crate::marshal`]).
    fn proof_bytes(&self, proof: &Self::Proof) -> Vec<u8>;

    /// Render the on-chain verifier source for `vk`. Pure function of `vk`.
    fn export_verifier(&self, vk: &Self::VerifyingKey) -> Result<String, SetupError>;
}

/// Arity guard shared by verifier implementations.
pub fn check_arity(expected: usize, got: usize) -> Result<(), Error> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::PublicInputArityMismatch { expected, got })
    }
}
