//! Persisted artifact envelope.
//!
//! Every artifact the store writes (constraint system, proving key, verifying
//! key) is wrapped in an [`Envelope`] before it hits disk:
//!
//! ```text
//! magic "HPAF" | format version | kind | curve | blake3(payload) | payload
//! ```
//!
//! The envelope makes a blob self-describing: loading a proving key from a
//! verifying-key path, a blob written for another curve, or a truncated file
//! is reported as corrupt instead of being handed to the proving system's
//! decoder. The payload itself stays opaque to this crate.
//!
//! The envelope does **not** bind a key pair to the constraint system it was
//! derived from; callers must keep the triple together.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::Curve;
use crate::error::CodecError;

/// Leading bytes of every envelope.
pub const ENVELOPE_MAGIC: [u8; 4] = *b"HPAF";

/// Envelope format version written by this crate.
pub const ENVELOPE_VERSION: u16 = 1;

/// Which member of the artifact triple a blob holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Compiled constraint system.
    ConstraintSystem,
    /// Groth16 proving key.
    ProvingKey,
    /// Groth16 verifying key.
    VerifyingKey,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConstraintSystem => "constraint-system",
            Self::ProvingKey => "proving-key",
            Self::VerifyingKey => "verifying-key",
        })
    }
}

/// Binary codec for a persisted artifact.
///
/// Implemented by the proving system's constraint-system and key types.
pub trait Artifact: Sized {
    /// Kind tag written into the envelope.
    const KIND: ArtifactKind;

    /// Curve the artifact was produced for.
    fn curve(&self) -> Curve;

    /// Encode into the opaque payload.
    fn to_payload(&self) -> Result<Vec<u8>, CodecError>;

    /// Decode from the opaque payload.
    fn from_payload(bytes: &[u8]) -> Result<Self, CodecError>;
}

/// Self-describing wrapper around an artifact payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    magic: [u8; 4],
    version: u16,
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Curve the payload belongs to.
    pub curve: Curve,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

impl Envelope {
    /// Wrap `payload`, computing its checksum.
    #[must_use]
    pub fn seal(kind: ArtifactKind, curve: Curve, payload: Vec<u8>) -> Self {
        Self {
            magic: ENVELOPE_MAGIC,
            version: ENVELOPE_VERSION,
            kind,
            curve,
            checksum: *blake3::hash(&payload).as_bytes(),
            payload,
        }
    }

    /// Seal an artifact.
    pub fn of<A: Artifact>(artifact: &A) -> Result<Self, CodecError> {
        Ok(Self::seal(A::KIND, artifact.curve(), artifact.to_payload()?))
    }

    /// Serialize the envelope with `bincode`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(self)?)
    }

    /// Parse and check an envelope.
    ///
    /// Fails on a wrong magic, an unknown version, a kind or curve other than
    /// the expected one, or a payload whose checksum does not match.
    pub fn open(bytes: &[u8], kind: ArtifactKind, curve: Curve) -> Result<Self, String> {
        let env: Self =
            bincode::deserialize(bytes).map_err(|e| format!("undecodable envelope: {e}"))?;
        if env.magic != ENVELOPE_MAGIC {
            return Err(format!("bad magic {}", hex::encode(env.magic)));
        }
        if env.version != ENVELOPE_VERSION {
            return Err(format!(
                "unsupported envelope version {} (expected {ENVELOPE_VERSION})",
                env.version
            ));
        }
        if env.kind != kind {
            return Err(format!("holds a {} artifact, expected {kind}", env.kind));
        }
        if env.curve != curve {
            return Err(format!("built for curve {}, expected {curve}", env.curve));
        }
        if *blake3::hash(&env.payload).as_bytes() != env.checksum {
            return Err("payload checksum mismatch".to_owned());
        }
        Ok(env)
    }

    /// Borrow the payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload as `A`.
    pub fn decode<A: Artifact>(&self) -> Result<A, String> {
        A::from_payload(&self.payload).map_err(|e| format!("payload decode failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_envelope_opens() {
        let env = Envelope::seal(ArtifactKind::VerifyingKey, Curve::Bn254, vec![1, 2, 3]);
        let bytes = env.to_bytes().unwrap();
        let back = Envelope::open(&bytes, ArtifactKind::VerifyingKey, Curve::Bn254).unwrap();
        assert_eq!(back.payload(), &[1, 2, 3]);
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let env = Envelope::seal(ArtifactKind::ProvingKey, Curve::Bn254, vec![9]);
        let bytes = env.to_bytes().unwrap();
        let err = Envelope::open(&bytes, ArtifactKind::VerifyingKey, Curve::Bn254).unwrap_err();
        assert!(err.contains("proving-key"), "{err}");
    }

    #[test]
    fn curve_mismatch_is_reported() {
        let env = Envelope::seal(ArtifactKind::ProvingKey, Curve::Bls12_381, vec![9]);
        let bytes = env.to_bytes().unwrap();
        assert!(Envelope::open(&bytes, ArtifactKind::ProvingKey, Curve::Bn254).is_err());
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() {
        let env = Envelope::seal(ArtifactKind::ConstraintSystem, Curve::Bn254, vec![0u8; 64]);
        let mut bytes = env.to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let err =
            Envelope::open(&bytes, ArtifactKind::ConstraintSystem, Curve::Bn254).unwrap_err();
        assert!(err.contains("checksum"), "{err}");
    }

    #[test]
    fn truncated_blob_is_undecodable() {
        let env = Envelope::seal(ArtifactKind::ConstraintSystem, Curve::Bn254, vec![5u8; 64]);
        let bytes = env.to_bytes().unwrap();
        let err = Envelope::open(&bytes[..bytes.len() / 2], ArtifactKind::ConstraintSystem, Curve::Bn254)
            .unwrap_err();
        assert!(err.contains("undecodable"), "{err}");
    }
}
