//! The verifier-call argument tuple and its Solidity ABI encoding.
//!
//! Entry point (fixed external ABI):
//!
//! ```solidity
//! function verifyProof(
//!     uint256[2] memory a,
//!     uint256[2][2] memory b,
//!     uint256[2] memory c,
//!     uint256[1] memory input
//! ) public view returns (bool r);
//! ```
//!
//! All arguments are static arrays, so the ABI encoding is the 4-byte
//! selector followed by `8 + N` 32-byte big-endian words in declaration
//! order (`b` row-major).

use num_bigint::BigUint;
use sha3::{Digest, Keccak256};

use crate::error::Error;
use crate::field::pad_be;

/// Size of one ABI word.
pub const ABI_WORD: usize = 32;

/// Words taken by `a`, `b` and `c`.
pub const PROOF_WORDS: usize = 8;

/// Arguments of one `verifyProof` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallData {
    /// Proof point A.
    pub a: [BigUint; 2],
    /// Proof point B, `b[coordinate][component]`.
    pub b: [[BigUint; 2]; 2],
    /// Proof point C.
    pub c: [BigUint; 2],
    /// Public inputs.
    pub input: Vec<BigUint>,
}

/// Canonical signature of the verifier entry point for `n` public inputs.
#[must_use]
pub fn verify_signature(n: usize) -> String {
    format!("verifyProof(uint256[2],uint256[2][2],uint256[2],uint256[{n}])")
}

/// 4-byte function selector: first bytes of Keccak-256 of the signature.
#[must_use]
pub fn verify_selector(n: usize) -> [u8; 4] {
    let h = Keccak256::digest(verify_signature(n).as_bytes());
    [h[0], h[1], h[2], h[3]]
}

/// Calldata that cannot be decoded for a verifier with a given arity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    /// Wrong total length.
    #[error("calldata is {got} bytes, expected {expected}")]
    Length {
        /// Expected length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// Selector does not match the entry point.
    #[error("unknown selector 0x{0}")]
    Selector(String),
}

impl CallData {
    /// Proof words in ABI order: `a`, `b` row-major, `c`.
    pub fn proof_words(&self) -> impl Iterator<Item = &BigUint> {
        self.a
            .iter()
            .chain(self.b.iter().flatten())
            .chain(self.c.iter())
    }

    /// Replace the public inputs, keeping the proof.
    #[must_use]
    pub fn with_input(mut self, input: Vec<BigUint>) -> Self {
        self.input = input;
        self
    }

    /// ABI-encode a `verifyProof` call, selector included.
    ///
    /// # Errors
    /// [`Error::EncodingOverflow`] if any word exceeds 256 bits (only possible
    /// with a layout wider than the EVM word, e.g. a 48-byte curve).
    pub fn abi_encode(&self) -> Result<Vec<u8>, Error> {
        let n = self.input.len();
        let mut out = Vec::with_capacity(4 + (PROOF_WORDS + n) * ABI_WORD);
        out.extend_from_slice(&verify_selector(n));
        for (i, w) in self.proof_words().enumerate() {
            out.extend(pad_be(w, ABI_WORD, &format!("proof word {i}"))?);
        }
        for (i, w) in self.input.iter().enumerate() {
            out.extend(pad_be(w, ABI_WORD, &format!("input[{i}]"))?);
        }
        Ok(out)
    }

    /// Decode a `verifyProof` call for a verifier with `n` public inputs.
    pub fn abi_decode(bytes: &[u8], n: usize) -> Result<Self, AbiError> {
        let expected = 4 + (PROOF_WORDS + n) * ABI_WORD;
        if bytes.len() != expected {
            return Err(AbiError::Length {
                expected,
                got: bytes.len(),
            });
        }
        let (sel, body) = bytes.split_at(4);
        if sel != verify_selector(n) {
            return Err(AbiError::Selector(hex::encode(sel)));
        }
        let word = |i: usize| BigUint::from_bytes_be(&body[i * ABI_WORD..(i + 1) * ABI_WORD]);
        Ok(Self {
            a: [word(0), word(1)],
            b: [[word(2), word(3)], [word(4), word(5)]],
            c: [word(6), word(7)],
            input: (0..n).map(|i| word(PROOF_WORDS + i)).collect(),
        })
    }
}
