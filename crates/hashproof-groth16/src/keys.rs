//! Proving and verifying keys as persisted artifacts.

use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use hashproof_core::{Artifact, ArtifactKind, CodecError, Curve};

pub(crate) fn encode<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(value.compressed_size());
    value
        .serialize_compressed(&mut buf)
        .map_err(|e| e.to_string())?;
    Ok(buf)
}

pub(crate) fn decode<T: CanonicalDeserialize>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut reader = bytes;
    let value = T::deserialize_compressed(&mut reader).map_err(|e| e.to_string())?;
    if !reader.is_empty() {
        return Err(format!("{} trailing bytes after key", reader.len()).into());
    }
    Ok(value)
}

/// Groth16 proving key over BN254.
#[derive(Debug, Clone, PartialEq)]
pub struct Groth16ProvingKey(pub ProvingKey<Bn254>);

/// Groth16 verifying key over BN254.
#[derive(Debug, Clone, PartialEq)]
pub struct Groth16VerifyingKey(pub VerifyingKey<Bn254>);

impl Groth16VerifyingKey {
    /// Public inputs the key was generated for.
    #[must_use]
    pub fn public_input_count(&self) -> usize {
        self.0.gamma_abc_g1.len().saturating_sub(1)
    }
}

impl Artifact for Groth16ProvingKey {
    const KIND: ArtifactKind = ArtifactKind::ProvingKey;

    fn curve(&self) -> Curve {
        Curve::Bn254
    }

    fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        encode(&self.0)
    }

    fn from_payload(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes).map(Self)
    }
}

impl Artifact for Groth16VerifyingKey {
    const KIND: ArtifactKind = ArtifactKind::VerifyingKey;

    fn curve(&self) -> Curve {
        Curve::Bn254
    }

    fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        encode(&self.0)
    }

    fn from_payload(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes).map(Self)
    }
}
