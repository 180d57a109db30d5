//! Circuit descriptor: which relation is proved and which fields are public.
//!
//! The descriptor carries no constraint logic. It names the two fields of the
//! preimage relation, their visibility, and the hash function (with its seed)
//! the proving system must encode.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SetupError;

/// Pairing-friendly curves a proving system may target.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    /// BN254 (alt_bn128), the curve of the EVM pairing precompiles.
    Bn254,
    /// BLS12-381.
    Bls12_381,
}

impl Curve {
    /// Byte width of a base-field element (one curve coordinate).
    #[must_use]
    pub const fn base_field_bytes(self) -> usize {
        match self {
            Self::Bn254 => 32,
            Self::Bls12_381 => 48,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bn254 => "bn254",
            Self::Bls12_381 => "bls12_381",
        })
    }
}

/// Visibility of a circuit field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Known only to the prover.
    Secret,
    /// Part of the statement checked by the verifier.
    Public,
}

/// A named circuit field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field name (must be non-empty and unique in the descriptor).
    pub name: String,
    /// Who gets to see the value.
    pub visibility: Visibility,
}

impl FieldDecl {
    /// Secret field named `name`.
    #[must_use]
    pub fn secret(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Secret,
        }
    }

    /// Public field named `name`.
    #[must_use]
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
        }
    }
}

/// Hash function the circuit asserts over the secret.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HashFunction {
    /// MiMC in Miyaguchi–Preneel mode with round constants derived from `seed`.
    Mimc {
        /// Seed string for the round-constant derivation.
        seed: String,
    },
}

/// Declares the relation `hash(secret) == public`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CircuitDescriptor {
    /// Human-readable relation name (used for artifact file stems).
    pub name: String,
    /// Declared fields; a valid descriptor has exactly one secret and one public field.
    pub fields: Vec<FieldDecl>,
    /// Hash function the relation is built on.
    pub hash: HashFunction,
}

impl CircuitDescriptor {
    /// The canonical preimage-knowledge relation: secret `secret`, public `hash`,
    /// MiMC with the given seed.
    #[must_use]
    pub fn mimc_preimage(seed: impl Into<String>) -> Self {
        Self {
            name: "mimc".to_owned(),
            fields: vec![FieldDecl::secret("secret"), FieldDecl::public("hash")],
            hash: HashFunction::Mimc { seed: seed.into() },
        }
    }

    /// Check that the descriptor can be realized as the preimage relation.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.name.trim().is_empty() {
            return Err(SetupError::InvalidConstraint(
                "descriptor name must not be empty".into(),
            ));
        }
        let secrets = self.count(Visibility::Secret);
        let publics = self.count(Visibility::Public);
        if secrets != 1 || publics != 1 {
            return Err(SetupError::InvalidConstraint(format!(
                "preimage relation needs exactly one secret and one public field, found {secrets} secret / {publics} public"
            )));
        }
        if self.fields.iter().any(|f| f.name.trim().is_empty()) {
            return Err(SetupError::InvalidConstraint(
                "field names must not be empty".into(),
            ));
        }
        if self.fields[0].name == self.fields[1].name {
            return Err(SetupError::InvalidConstraint(format!(
                "duplicate field name `{}`",
                self.fields[0].name
            )));
        }
        match &self.hash {
            HashFunction::Mimc { seed } if seed.is_empty() => Err(
                SetupError::InvalidConstraint("MiMC seed must not be empty".into()),
            ),
            HashFunction::Mimc { .. } => Ok(()),
        }
    }

    /// The secret field, if declared.
    #[must_use]
    pub fn secret_field(&self) -> Option<&FieldDecl> {
        self.find(Visibility::Secret)
    }

    /// The public field, if declared.
    #[must_use]
    pub fn public_field(&self) -> Option<&FieldDecl> {
        self.find(Visibility::Public)
    }

    /// Number of public inputs the relation exposes.
    #[must_use]
    pub fn public_input_count(&self) -> usize {
        self.count(Visibility::Public)
    }

    fn count(&self, v: Visibility) -> usize {
        self.fields.iter().filter(|f| f.visibility == v).count()
    }

    fn find(&self, v: Visibility) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.visibility == v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_descriptor_is_valid() {
        let d = CircuitDescriptor::mimc_preimage("seed");
        d.validate().unwrap();
        assert_eq!(d.secret_field().unwrap().name, "secret");
        assert_eq!(d.public_field().unwrap().name, "hash");
        assert_eq!(d.public_input_count(), 1);
    }

    #[test]
    fn two_public_fields_are_rejected() {
        let mut d = CircuitDescriptor::mimc_preimage("seed");
        d.fields[0].visibility = Visibility::Public;
        assert!(matches!(d.validate(), Err(SetupError::InvalidConstraint(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut d = CircuitDescriptor::mimc_preimage("seed");
        d.fields[1].name = "secret".into();
        assert!(matches!(d.validate(), Err(SetupError::InvalidConstraint(_))));
    }

    #[test]
    fn empty_seed_is_rejected() {
        let d = CircuitDescriptor::mimc_preimage("");
        assert!(d.validate().is_err());
    }

    #[test]
    fn coordinate_width_follows_the_curve() {
        assert_eq!(Curve::Bn254.base_field_bytes(), 32);
        assert_eq!(Curve::Bls12_381.base_field_bytes(), 48);
        assert_eq!(Curve::Bn254.to_string(), "bn254");
    }
}
