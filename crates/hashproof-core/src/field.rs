//! Field elements as plain big-endian unsigned integers.
//!
//! A [`FieldElement`] is range-checked when it is built (see
//! [`crate::witness::WitnessBuilder`]); afterwards it is only a number. The
//! proving system maps it into its own field representation.

use num_bigint::BigUint;
use std::fmt;

use crate::error::Error;

/// An integer known to be strictly less than some field modulus.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldElement(BigUint);

impl FieldElement {
    /// Wrap `value` if it is strictly less than `modulus`.
    #[must_use]
    pub fn new_checked(value: BigUint, modulus: &BigUint) -> Option<Self> {
        (value < *modulus).then_some(Self(value))
    }

    /// Borrow the underlying integer.
    #[inline]
    #[must_use]
    pub const fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Consume into the underlying integer.
    #[inline]
    #[must_use]
    pub fn into_biguint(self) -> BigUint {
        self.0
    }

    /// Minimal big-endian bytes (a single `0x00` for zero).
    #[must_use]
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    /// Big-endian bytes left-padded to exactly `width` bytes.
    pub fn to_padded_be(&self, width: usize) -> Result<Vec<u8>, Error> {
        pad_be(&self.0, width, "field element")
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement(0x{})", self.0.to_str_radix(16))
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimal big-endian byte length of `v` (zero has length 0 here).
#[must_use]
pub fn byte_len(v: &BigUint) -> usize {
    usize::try_from(v.bits().div_ceil(8)).unwrap_or(usize::MAX)
}

/// Left-pad `v` to `width` big-endian bytes, or report `EncodingOverflow`.
pub fn pad_be(v: &BigUint, width: usize, what: &str) -> Result<Vec<u8>, Error> {
    let len = byte_len(v);
    if len > width {
        return Err(Error::EncodingOverflow {
            what: what.to_owned(),
            bytes: len,
            width,
        });
    }
    let mut out = vec![0u8; width];
    if len > 0 {
        out[width - len..].copy_from_slice(&v.to_bytes_be());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_zero_is_all_zero_bytes() {
        assert_eq!(pad_be(&BigUint::from(0u8), 4, "z").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn pad_keeps_big_endian_order() {
        let v = BigUint::from(0x0102_0304u32);
        assert_eq!(pad_be(&v, 6, "v").unwrap(), vec![0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn pad_rejects_wider_values() {
        let v = BigUint::from(1u8) << 32;
        match pad_be(&v, 4, "wide") {
            Err(Error::EncodingOverflow { bytes, width, .. }) => {
                assert_eq!((bytes, width), (5, 4));
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn checked_construction_enforces_strict_bound() {
        let m = BigUint::from(97u8);
        assert!(FieldElement::new_checked(BigUint::from(96u8), &m).is_some());
        assert!(FieldElement::new_checked(BigUint::from(97u8), &m).is_none());
    }
}
