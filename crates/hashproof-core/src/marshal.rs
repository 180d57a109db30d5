//! Proof-to-calldata marshalling.
//!
//! A Groth16 proof is three points. Its raw stream is eight consecutive
//! coordinates, each exactly `field_byte_width` bytes, big-endian:
//!
//! ```text
//! chunk:  0    1    2     3     4     5     6    7
//!         A.x  A.y  B.x0  B.x1  B.y0  B.y1  C.x  C.y
//! ```
//!
//! The verifier contract takes `(uint256[2] a, uint256[2][2] b, uint256[2] c,
//! uint256[N] input)`, with `b` row-major: the outer index selects the
//! coordinate (x, y) and the inner index the component of the quadratic
//! extension element. The EVM pairing precompile wants the *imaginary*
//! component first. Whether the stream already carries that order or has to
//! be swapped is a property of the proving system's encoding, described by
//! [`ProofLayout::g2_order`]; offsets are never hard-coded outside this module.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::calldata::CallData;
use crate::descriptor::Curve;
use crate::error::Error;
use crate::field::{pad_be, FieldElement};

/// Number of coordinate chunks in a Groth16 proof stream.
pub const PROOF_CHUNKS: usize = 8;

/// Component order of the G2 coordinates inside the raw stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum G2Order {
    /// Stream already has (imaginary, real): copy in stream order.
    ImaginaryFirst,
    /// Stream has (real, imaginary): swap within each coordinate.
    RealFirst,
}

/// Byte layout of a proof stream, supplied by the proving system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofLayout {
    /// Width in bytes of one coordinate chunk and one public input.
    pub field_byte_width: usize,
    /// G2 component order inside the stream.
    pub g2_order: G2Order,
}

impl ProofLayout {
    /// Layout for `curve` with the given G2 component order.
    #[must_use]
    pub const fn for_curve(curve: Curve, g2_order: G2Order) -> Self {
        Self {
            field_byte_width: curve.base_field_bytes(),
            g2_order,
        }
    }

    /// Total length of a well-formed proof stream.
    #[must_use]
    pub const fn proof_len(&self) -> usize {
        PROOF_CHUNKS * self.field_byte_width
    }

    /// Stream chunk index feeding `b[row][col]`.
    #[must_use]
    pub const fn b_chunk(&self, row: usize, col: usize) -> usize {
        let col = match self.g2_order {
            G2Order::ImaginaryFirst => col,
            G2Order::RealFirst => 1 - col,
        };
        2 + 2 * row + col
    }
}

/// Turns proofs and public inputs into [`CallData`] for one verifying key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marshaller {
    layout: ProofLayout,
    public_inputs: usize,
}

impl Marshaller {
    /// Marshaller for a layout and the verifying key's public-input count.
    #[must_use]
    pub const fn new(layout: ProofLayout, public_inputs: usize) -> Self {
        Self {
            layout,
            public_inputs,
        }
    }

    /// The layout in use.
    #[must_use]
    pub const fn layout(&self) -> &ProofLayout {
        &self.layout
    }

    /// Number of public inputs every call must carry.
    #[must_use]
    pub const fn public_inputs(&self) -> usize {
        self.public_inputs
    }

    /// Slice a raw proof stream and encode public inputs.
    ///
    /// # Errors
    /// - [`Error::ProofLengthMismatch`] if the stream is not exactly
    ///   `8 × field_byte_width` bytes;
    /// - [`Error::PublicInputArityMismatch`] if the input count differs from
    ///   the verifying key's;
    /// - [`Error::EncodingOverflow`] if a public input is wider than the width.
    pub fn marshal(&self, proof: &[u8], inputs: &[FieldElement]) -> Result<CallData, Error> {
        let w = self.layout.field_byte_width;
        if proof.len() != self.layout.proof_len() {
            return Err(Error::ProofLengthMismatch {
                expected: self.layout.proof_len(),
                got: proof.len(),
            });
        }
        if inputs.len() != self.public_inputs {
            return Err(Error::PublicInputArityMismatch {
                expected: self.public_inputs,
                got: inputs.len(),
            });
        }

        let chunk = |i: usize| BigUint::from_bytes_be(&proof[i * w..(i + 1) * w]);
        let b = |row, col| chunk(self.layout.b_chunk(row, col));

        let input = inputs
            .iter()
            .enumerate()
            .map(|(i, x)| {
                pad_be(x.as_biguint(), w, &format!("input[{i}]"))?;
                Ok(x.as_biguint().clone())
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(CallData {
            a: [chunk(0), chunk(1)],
            b: [[b(0, 0), b(0, 1)], [b(1, 0), b(1, 1)]],
            c: [chunk(6), chunk(7)],
            input,
        })
    }
}

/// One-shot form of [`Marshaller::marshal`] for callers holding only a width.
///
/// Assumes a stream whose G2 components are already in EVM order and takes
/// the arity from `inputs`.
pub fn marshal(
    proof: &[u8],
    inputs: &[FieldElement],
    field_byte_width: usize,
) -> Result<CallData, Error> {
    let layout = ProofLayout {
        field_byte_width,
        g2_order: G2Order::ImaginaryFirst,
    };
    Marshaller::new(layout, inputs.len()).marshal(proof, inputs)
}

impl CallData {
    /// Re-slice the proof words back into the raw stream they came from.
    ///
    /// Inverse of [`Marshaller::marshal`] for the proof part.
    pub fn to_proof_bytes(&self, layout: &ProofLayout) -> Result<Vec<u8>, Error> {
        let w = layout.field_byte_width;
        let mut chunks: [Option<&BigUint>; PROOF_CHUNKS] = [None; PROOF_CHUNKS];
        chunks[0] = Some(&self.a[0]);
        chunks[1] = Some(&self.a[1]);
        for row in 0..2 {
            for col in 0..2 {
                chunks[layout.b_chunk(row, col)] = Some(&self.b[row][col]);
            }
        }
        chunks[6] = Some(&self.c[0]);
        chunks[7] = Some(&self.c[1]);

        let mut out = Vec::with_capacity(layout.proof_len());
        for (i, v) in chunks.iter().enumerate() {
            let v = v.ok_or_else(|| Error::Backend(format!("layout leaves chunk {i} unfilled")))?;
            out.extend(pad_be(v, w, &format!("proof chunk {i}"))?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(w: usize) -> Vec<u8> {
        // Chunk i is filled with byte value i+1 so placement is visible.
        (0..PROOF_CHUNKS)
            .flat_map(|i| std::iter::repeat(u8::try_from(i + 1).unwrap()).take(w))
            .collect()
    }

    fn fe(v: u64) -> FieldElement {
        FieldElement::new_checked(BigUint::from(v), &(BigUint::from(1u8) << 254)).unwrap()
    }

    fn filled(byte: u8, w: usize) -> BigUint {
        BigUint::from_bytes_be(&vec![byte; w])
    }

    #[test]
    fn chunks_land_in_documented_slots() {
        let cd = marshal(&stream(32), &[fe(42)], 32).unwrap();
        assert_eq!(cd.a, [filled(1, 32), filled(2, 32)]);
        assert_eq!(cd.b[0], [filled(3, 32), filled(4, 32)]);
        assert_eq!(cd.b[1], [filled(5, 32), filled(6, 32)]);
        assert_eq!(cd.c, [filled(7, 32), filled(8, 32)]);
        assert_eq!(cd.input, vec![BigUint::from(42u8)]);
    }

    #[test]
    fn real_first_streams_are_swapped_within_each_coordinate() {
        let layout = ProofLayout::for_curve(Curve::Bn254, G2Order::RealFirst);
        let cd = Marshaller::new(layout, 1).marshal(&stream(32), &[fe(1)]).unwrap();
        assert_eq!(cd.b[0], [filled(4, 32), filled(3, 32)]);
        assert_eq!(cd.b[1], [filled(6, 32), filled(5, 32)]);
        assert_eq!(cd.to_proof_bytes(&layout).unwrap(), stream(32));
    }

    #[test]
    fn short_stream_is_rejected() {
        let err = marshal(&stream(32)[..255], &[fe(1)], 32).unwrap_err();
        assert!(matches!(
            err,
            Error::ProofLengthMismatch {
                expected: 256,
                got: 255
            }
        ));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let layout = ProofLayout::for_curve(Curve::Bn254, G2Order::ImaginaryFirst);
        let err = Marshaller::new(layout, 1)
            .marshal(&stream(32), &[fe(1), fe(2)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PublicInputArityMismatch {
                expected: 1,
                got: 2
            }
        ));
    }

    #[test]
    fn wide_public_input_overflows() {
        let layout = ProofLayout {
            field_byte_width: 4,
            g2_order: G2Order::ImaginaryFirst,
        };
        let err = Marshaller::new(layout, 1)
            .marshal(&stream(4), &[fe(1 << 40)])
            .unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow { width: 4, .. }));
    }

    #[test]
    fn width_follows_curve() {
        let bls = ProofLayout::for_curve(Curve::Bls12_381, G2Order::RealFirst);
        assert_eq!(bls.proof_len(), 384);
        let cd = Marshaller::new(bls, 1).marshal(&stream(48), &[fe(3)]).unwrap();
        assert_eq!(cd.to_proof_bytes(&bls).unwrap(), stream(48));
    }
}
