//! hashproof-groth16: Groth16 over BN254 for the MiMC preimage relation.
//!
//! [`Groth16Bn254`] implements [`hashproof_core::ProvingSystem`]:
//!
//! - **compile** synthesizes `mimc(secret) == hash` and keeps the sparse
//!   R1CS matrices ([`CompiledR1cs`]);
//! - **setup** runs the circuit-specific trusted setup over those matrices
//!   with OS randomness, so every run yields a fresh, unrelated key pair;
//! - **prove** solves the assignment, checks every constraint (a wrong
//!   digest is `UnsatisfiedConstraint`, never a proof) and proves;
//! - **export_verifier** renders a Solidity verifier for the BN254
//!   precompiles.
//!
//! The raw proof stream carries G2 coordinates real component first; the
//! advertised layout tells the marshaller to swap them for the EVM.

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
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]

/// Constraint synthesizers.
pub mod circuit;
/// Persisted proving and verifying keys.
pub mod keys;
/// MiMC hash, native and in-circuit.
pub mod mimc;
/// Field and point conversions to EVM words.
pub mod points;
/// Compiled constraint system.
pub mod r1cs;
/// Solidity verifier export and parsing.
pub mod solidity;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use num_bigint::BigUint;
use rand::rngs::OsRng;
use std::time::Instant;
use tracing::{debug, info};

use hashproof_core::{
    check_arity, CircuitDescriptor, Curve, Error, FieldElement, G2Order, HashFunction,
    ProofLayout, ProvingSystem, SetupError, Witness, WitnessError,
};

pub use circuit::{MatrixCircuit, PreimageCircuit};
pub use keys::{Groth16ProvingKey, Groth16VerifyingKey};
pub use mimc::{Mimc, MIMC_ROUNDS};
pub use r1cs::CompiledR1cs;
pub use solidity::{export_verifier, parse_verifier_source, VerifierConstants};

/// Groth16 proving system on BN254.
#[derive(Debug, Clone, Copy, Default)]
pub struct Groth16Bn254;

fn to_fr(v: &FieldElement, field: &'static str) -> Result<Fr, Error> {
    points::fr_from_biguint(v.as_biguint())
        .ok_or(Error::Witness(WitnessError::ValueOutOfRange { field }))
}

fn from_fr(f: &Fr) -> Result<FieldElement, Error> {
    FieldElement::new_checked(points::fr_to_biguint(f), &points::scalar_modulus())
        .ok_or_else(|| Error::Backend("non-canonical scalar".into()))
}

impl ProvingSystem for Groth16Bn254 {
    type ConstraintSystem = CompiledR1cs;
    type ProvingKey = Groth16ProvingKey;
    type VerifyingKey = Groth16VerifyingKey;
    type Proof = Proof<Bn254>;

    fn curve(&self) -> Curve {
        Curve::Bn254
    }

    fn scalar_modulus(&self) -> BigUint {
        points::scalar_modulus()
    }

    fn proof_layout(&self) -> ProofLayout {
        ProofLayout::for_curve(Curve::Bn254, G2Order::RealFirst)
    }

    fn compile(
        &self,
        descriptor: &CircuitDescriptor,
        curve: Curve,
    ) -> Result<CompiledR1cs, SetupError> {
        if curve != Curve::Bn254 {
            return Err(SetupError::UnsupportedCurve(curve));
        }
        descriptor.validate()?;
        match &descriptor.hash {
            HashFunction::Mimc { seed } => CompiledR1cs::compile(seed, MIMC_ROUNDS),
            other => Err(SetupError::InvalidConstraint(format!(
                "unsupported hash function {other:?}"
            ))),
        }
    }

    fn setup(
        &self,
        cs: &CompiledR1cs,
    ) -> Result<(Groth16ProvingKey, Groth16VerifyingKey), SetupError> {
        let t0 = Instant::now();
        let (pk, vk) =
            Groth16::<Bn254>::circuit_specific_setup(MatrixCircuit::setup(cs), &mut OsRng)
                .map_err(|e| SetupError::KeyGeneration(e.to_string()))?;
        info!(
            constraints = cs.num_constraints(),
            ms = t0.elapsed().as_millis(),
            "groth16 keys generated"
        );
        Ok((Groth16ProvingKey(pk), Groth16VerifyingKey(vk)))
    }

    fn digest(&self, cs: &CompiledR1cs, secret: &FieldElement) -> Result<FieldElement, Error> {
        let x = to_fr(secret, "secret")?;
        from_fr(&cs.mimc().hash(&[x]))
    }

    fn prove(
        &self,
        cs: &CompiledR1cs,
        pk: &Groth16ProvingKey,
        witness: &Witness,
    ) -> Result<Proof<Bn254>, Error> {
        let secret = to_fr(witness.secret(), "secret")?;
        let hash = to_fr(witness.public(), "digest")?;
        let z = cs.solve(secret, hash)?;
        cs.check_satisfied(&z)?;

        let t0 = Instant::now();
        let proof = Groth16::<Bn254>::prove(&pk.0, MatrixCircuit::proving(cs, &z), &mut OsRng)
            .map_err(|e| Error::Backend(e.to_string()))?;
        debug!(ms = t0.elapsed().as_millis(), "groth16 proof created");
        Ok(proof)
    }

    fn verify(
        &self,
        proof: &Proof<Bn254>,
        vk: &Groth16VerifyingKey,
        public_inputs: &[FieldElement],
    ) -> Result<bool, Error> {
        check_arity(vk.public_input_count(), public_inputs.len())?;
        let inputs = public_inputs
            .iter()
            .map(|x| to_fr(x, "public input"))
            .collect::<Result<Vec<_>, _>>()?;
        Groth16::<Bn254>::verify(&vk.0, &inputs, proof).map_err(|e| Error::Backend(e.to_string()))
    }

    fn public_input_count(&self, vk: &Groth16VerifyingKey) -> usize {
        vk.public_input_count()
    }

    fn proof_bytes(&self, proof: &Proof<Bn254>) -> Vec<u8> {
        points::proof_stream(proof)
    }

    fn export_verifier(&self, vk: &Groth16VerifyingKey) -> Result<String, SetupError> {
        let source = export_verifier(vk);
        parse_verifier_source(&source).map_err(SetupError::Export)?;
        Ok(source)
    }
}
