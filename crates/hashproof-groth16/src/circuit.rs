//! Constraint synthesizers.
//!
//! [`PreimageCircuit`] is the relation itself, `mimc(secret) == hash`, and is
//! only synthesized directly when compiling or solving. Key generation and
//! proving run [`MatrixCircuit`], which replays a persisted constraint system
//! row by row so the keys are bound to exactly what was compiled.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar};
use ark_relations::lc;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystemRef, LinearCombination, SynthesisError, Variable,
};

use crate::mimc::Mimc;
use crate::r1cs::{CompiledR1cs, Term};

/// Knowledge of a MiMC preimage: witness `secret`, public input `hash`.
#[derive(Clone)]
pub struct PreimageCircuit<'a> {
    /// Hash parameters.
    pub mimc: &'a Mimc,
    /// Secret preimage (absent during compilation).
    pub secret: Option<Fr>,
    /// Claimed digest (absent during compilation).
    pub hash: Option<Fr>,
}

impl<'a> PreimageCircuit<'a> {
    /// Shape-only instance for compilation.
    #[must_use]
    pub const fn blank(mimc: &'a Mimc) -> Self {
        Self {
            mimc,
            secret: None,
            hash: None,
        }
    }
}

impl ConstraintSynthesizer<Fr> for PreimageCircuit<'_> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public input first: it becomes instance variable #1.
        let hash = FpVar::new_input(cs.clone(), || {
            self.hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let secret = FpVar::new_witness(cs, || {
            self.secret.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let out = self.mimc.hash_gadget(&[secret])?;
        out.enforce_equal(&hash)
    }
}

/// Replays a [`CompiledR1cs`], optionally with a full assignment.
pub struct MatrixCircuit<'a> {
    r1cs: &'a CompiledR1cs,
    assignment: Option<&'a [Fr]>,
}

impl<'a> MatrixCircuit<'a> {
    /// Shape only, for key generation.
    #[must_use]
    pub const fn setup(r1cs: &'a CompiledR1cs) -> Self {
        Self {
            r1cs,
            assignment: None,
        }
    }

    /// With a full assignment `z = (1, instance.., witness..)`, for proving.
    #[must_use]
    pub const fn proving(r1cs: &'a CompiledR1cs, z: &'a [Fr]) -> Self {
        Self {
            r1cs,
            assignment: Some(z),
        }
    }

    fn value(&self, i: usize) -> Result<Fr, SynthesisError> {
        self.assignment
            .and_then(|z| z.get(i).copied())
            .ok_or(SynthesisError::AssignmentMissing)
    }
}

impl ConstraintSynthesizer<Fr> for MatrixCircuit<'_> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let num_instance = self.r1cs.num_instance();
        let mut vars = Vec::with_capacity(self.r1cs.num_variables());
        vars.push(Variable::One);
        for i in 1..num_instance {
            vars.push(cs.new_input_variable(|| self.value(i))?);
        }
        for j in 0..self.r1cs.num_witness() {
            vars.push(cs.new_witness_variable(|| self.value(num_instance + j))?);
        }

        let combine = |row: &[Term]| -> Result<LinearCombination<Fr>, SynthesisError> {
            row.iter().try_fold(lc!(), |acc, t| {
                let var = usize::try_from(t.index)
                    .ok()
                    .and_then(|i| vars.get(i))
                    .ok_or(SynthesisError::Unsatisfiable)?;
                Ok(acc + (t.coeff, *var))
            })
        };
        for (a, (b, c)) in self.r1cs.a.iter().zip(self.r1cs.b.iter().zip(&self.r1cs.c)) {
            cs.enforce_constraint(combine(a)?, combine(b)?, combine(c)?)?;
        }
        Ok(())
    }
}
