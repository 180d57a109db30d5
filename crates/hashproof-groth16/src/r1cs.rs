//! The persisted rank-1 constraint system and witness solving.
//!
//! Variable indexing follows arkworks' matrix convention: index `0` is the
//! constant one, `1..num_instance` are public inputs, and witness variables
//! follow at `num_instance..`.

use ark_bn254::Fr;
use ark_ff::Zero;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, OptimizationGoal, SynthesisError, SynthesisMode,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use tracing::debug;

use hashproof_core::{Artifact, ArtifactKind, CodecError, Curve, Error, SetupError};

use crate::circuit::PreimageCircuit;
use crate::keys::{decode, encode};
use crate::mimc::Mimc;

/// One non-zero matrix entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Term {
    /// Coefficient.
    pub coeff: Fr,
    /// Variable index.
    pub index: u64,
}

/// A compiled preimage relation: sparse `A`, `B`, `C` plus the MiMC
/// parameters it was built with.
#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct CompiledR1cs {
    num_instance: u64,
    num_witness: u64,
    /// Rows of `A`.
    pub a: Vec<Vec<Term>>,
    /// Rows of `B`.
    pub b: Vec<Vec<Term>>,
    /// Rows of `C`.
    pub c: Vec<Vec<Term>>,
    seed: Vec<u8>,
    rounds: u64,
}

fn to_usize(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

impl CompiledR1cs {
    /// Synthesize the preimage circuit for `seed` and keep its matrices.
    pub fn compile(seed: &str, rounds: usize) -> Result<Self, SetupError> {
        let mimc = Mimc::new(seed, rounds);
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Setup);
        PreimageCircuit::blank(&mimc)
            .generate_constraints(cs.clone())
            .map_err(|e| SetupError::InvalidConstraint(e.to_string()))?;
        cs.finalize();
        let m = cs
            .to_matrices()
            .ok_or_else(|| SetupError::InvalidConstraint("constraint matrices unavailable".into()))?;

        let rows = |mat: Vec<Vec<(Fr, usize)>>| -> Vec<Vec<Term>> {
            mat.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(coeff, i)| Term {
                            coeff,
                            index: i as u64,
                        })
                        .collect()
                })
                .collect()
        };
        let out = Self {
            num_instance: m.num_instance_variables as u64,
            num_witness: m.num_witness_variables as u64,
            a: rows(m.a),
            b: rows(m.b),
            c: rows(m.c),
            seed: seed.as_bytes().to_vec(),
            rounds: rounds as u64,
        };
        debug!(
            constraints = out.num_constraints(),
            instance = out.num_instance(),
            witness = out.num_witness(),
            "compiled preimage circuit"
        );
        Ok(out)
    }

    /// Instance variables, including the constant one.
    #[must_use]
    pub fn num_instance(&self) -> usize {
        to_usize(self.num_instance)
    }

    /// Witness variables.
    #[must_use]
    pub fn num_witness(&self) -> usize {
        to_usize(self.num_witness)
    }

    /// Total variables.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.num_instance().saturating_add(self.num_witness())
    }

    /// Number of constraints.
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.a.len()
    }

    /// Public inputs (instance variables without the constant one).
    #[must_use]
    pub fn num_public_inputs(&self) -> usize {
        self.num_instance().saturating_sub(1)
    }

    /// MiMC seed the relation was compiled with.
    #[must_use]
    pub fn seed(&self) -> &str {
        std::str::from_utf8(&self.seed).unwrap_or_default()
    }

    /// Hash parameters the relation encodes.
    #[must_use]
    pub fn mimc(&self) -> Mimc {
        Mimc::new(self.seed(), to_usize(self.rounds))
    }

    /// Structural checks run after decoding.
    pub fn validate(&self) -> Result<(), String> {
        if std::str::from_utf8(&self.seed).is_err() {
            return Err("MiMC seed is not UTF-8".into());
        }
        if self.num_instance == 0 {
            return Err("no instance variables (constant one missing)".into());
        }
        if self.b.len() != self.a.len() || self.c.len() != self.a.len() {
            return Err(format!(
                "matrix row counts differ: a={} b={} c={}",
                self.a.len(),
                self.b.len(),
                self.c.len()
            ));
        }
        let n = self.num_instance.saturating_add(self.num_witness);
        let oob = [&self.a, &self.b, &self.c]
            .into_iter()
            .flatten()
            .flatten()
            .find(|t| t.index >= n);
        if let Some(t) = oob {
            return Err(format!("term references variable {} of {n}", t.index));
        }
        Ok(())
    }

    /// Solve the full assignment `z` for a secret and claimed digest.
    ///
    /// The assignment is produced even when the digest is wrong; use
    /// [`Self::check_satisfied`] to find out.
    pub fn solve(&self, secret: Fr, hash: Fr) -> Result<Vec<Fr>, Error> {
        let mimc = self.mimc();
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Prove {
            construct_matrices: false,
        });
        PreimageCircuit {
            mimc: &mimc,
            secret: Some(secret),
            hash: Some(hash),
        }
        .generate_constraints(cs.clone())
        .map_err(|e: SynthesisError| Error::Backend(format!("witness generation: {e}")))?;

        let inner = cs
            .borrow()
            .ok_or_else(|| Error::Backend("constraint system already consumed".into()))?;
        if inner.instance_assignment.len() != self.num_instance()
            || inner.witness_assignment.len() != self.num_witness()
        {
            return Err(Error::Backend(format!(
                "circuit shape ({} instance, {} witness) differs from compiled ({}, {})",
                inner.instance_assignment.len(),
                inner.witness_assignment.len(),
                self.num_instance(),
                self.num_witness()
            )));
        }
        let mut z = inner.instance_assignment.clone();
        z.extend_from_slice(&inner.witness_assignment);
        Ok(z)
    }

    /// Check `<a,z>·<b,z> = <c,z>` for every constraint.
    ///
    /// # Errors
    /// [`Error::UnsatisfiedConstraint`] naming the first failing row.
    pub fn check_satisfied(&self, z: &[Fr]) -> Result<(), Error> {
        let eval = |row: &[Term]| {
            row.iter().fold(Fr::zero(), |acc, t| {
                acc + t.coeff * z.get(to_usize(t.index)).copied().unwrap_or_default()
            })
        };
        for (k, (a, (b, c))) in self
            .a
            .iter()
            .zip(self.b.iter().zip(&self.c))
            .enumerate()
        {
            if eval(a) * eval(b) != eval(c) {
                return Err(Error::UnsatisfiedConstraint(format!("constraint #{k}")));
            }
        }
        Ok(())
    }
}

impl Artifact for CompiledR1cs {
    const KIND: ArtifactKind = ArtifactKind::ConstraintSystem;

    fn curve(&self) -> Curve {
        Curve::Bn254
    }

    fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    fn from_payload(bytes: &[u8]) -> Result<Self, CodecError> {
        let r1cs: Self = decode(bytes)?;
        r1cs.validate()?;
        Ok(r1cs)
    }
}
