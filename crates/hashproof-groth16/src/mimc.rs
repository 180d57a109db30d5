//! MiMC over the BN254 scalar field, natively and as an R1CS gadget.
//!
//! Block cipher `E_k(m)`: `x₀ = m`, `xᵢ₊₁ = (xᵢ + k + cᵢ)⁷` for every round
//! constant, output `x_R + k`. Hash (Miyaguchi–Preneel): `h₀ = 0`,
//! `h ← E_h(m) + h + m` for each message element.
//!
//! Round constants: `c₀ = keccak256(seed)`, `cᵢ₊₁ = keccak256(cᵢ bytes)`, each
//! reduced into the field big-endian. The native and in-circuit versions must
//! produce the same value for every input; the test suite pins that.

use ark_bn254::Fr;
use ark_ff::{Field, PrimeField, Zero};
use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::SynthesisError;
use sha3::{Digest, Keccak256};

/// Round count for exponent 7 over a 254-bit field.
pub const MIMC_ROUNDS: usize = 91;

/// MiMC parameters: the derived round constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mimc {
    constants: Vec<Fr>,
}

impl Mimc {
    /// Derive `rounds` constants from `seed`.
    #[must_use]
    pub fn new(seed: &str, rounds: usize) -> Self {
        let mut constants = Vec::with_capacity(rounds);
        let mut h = Keccak256::digest(seed.as_bytes());
        for _ in 0..rounds {
            constants.push(Fr::from_be_bytes_mod_order(&h));
            h = Keccak256::digest(h);
        }
        Self { constants }
    }

    /// Number of rounds.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.constants.len()
    }

    /// The round constants.
    #[must_use]
    pub fn constants(&self) -> &[Fr] {
        &self.constants
    }

    fn encrypt(&self, key: Fr, msg: Fr) -> Fr {
        let mut x = msg;
        for c in &self.constants {
            let t = x + key + c;
            let t2 = t.square();
            let t4 = t2.square();
            x = t4 * t2 * t;
        }
        x + key
    }

    /// Hash a sequence of field elements.
    #[must_use]
    pub fn hash(&self, msg: &[Fr]) -> Fr {
        msg.iter()
            .fold(Fr::zero(), |h, m| self.encrypt(h, *m) + h + m)
    }

    /// In-circuit version of [`Self::hash`]; four multiplication constraints
    /// per round and message element.
    pub fn hash_gadget(&self, msg: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
        let mut h = FpVar::<Fr>::zero();
        for m in msg {
            let mut x = m.clone();
            for c in &self.constants {
                let t = &x + &h + *c;
                let t2 = t.square()?;
                let t4 = t2.square()?;
                x = &t4 * &t2 * &t;
            }
            // E_h(m) + h + m, with E_h(m) = x + h.
            h = &x + &h + &h + m;
        }
        Ok(h)
    }
}
