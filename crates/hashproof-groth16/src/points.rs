//! Field and curve-point conversions between arkworks and EVM words.
//!
//! EVM encoding: a G1 point is `[x, y]`; a G2 point is
//! `[[x.c1, x.c0], [y.c1, y.c0]]` (imaginary component first), matching the
//! `ecPairing` precompile. The point at infinity is all zeros.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_groth16::Proof;
use num_bigint::BigUint;

/// A word sequence that is not a valid curve point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointError {
    /// A coordinate is not reduced modulo the base-field prime.
    #[error("{0} coordinate is not below the base-field modulus")]
    CoordinateOutOfRange(&'static str),
    /// The coordinates do not satisfy the curve equation.
    #[error("{0} point is not on the curve")]
    NotOnCurve(&'static str),
    /// The point is on the curve but outside the prime-order subgroup.
    #[error("{0} point is not in the prime-order subgroup")]
    WrongSubgroup(&'static str),
}

/// Scalar-field modulus `r`.
#[must_use]
pub fn scalar_modulus() -> BigUint {
    BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be())
}

/// Base-field modulus `q`.
#[must_use]
pub fn base_modulus() -> BigUint {
    BigUint::from_bytes_be(&Fq::MODULUS.to_bytes_be())
}

/// Canonical integer of a base-field element.
#[must_use]
pub fn fq_to_biguint(f: &Fq) -> BigUint {
    BigUint::from_bytes_be(&f.into_bigint().to_bytes_be())
}

/// Canonical integer of a scalar-field element.
#[must_use]
pub fn fr_to_biguint(f: &Fr) -> BigUint {
    BigUint::from_bytes_be(&f.into_bigint().to_bytes_be())
}

/// Scalar-field element for `v`, or `None` if `v ≥ r`.
#[must_use]
pub fn fr_from_biguint(v: &BigUint) -> Option<Fr> {
    (*v < scalar_modulus()).then(|| Fr::from_be_bytes_mod_order(&v.to_bytes_be()))
}

/// Base-field element for `v`, or `None` if `v ≥ q`.
#[must_use]
pub fn fq_from_biguint(v: &BigUint) -> Option<Fq> {
    (*v < base_modulus()).then(|| Fq::from_be_bytes_mod_order(&v.to_bytes_be()))
}

/// `[x, y]`; infinity as `[0, 0]`.
#[must_use]
pub fn g1_to_evm(p: &G1Affine) -> [BigUint; 2] {
    if p.infinity {
        return [BigUint::zero(), BigUint::zero()];
    }
    [fq_to_biguint(&p.x), fq_to_biguint(&p.y)]
}

/// `[[x.c1, x.c0], [y.c1, y.c0]]`; infinity as zeros.
#[must_use]
pub fn g2_to_evm(p: &G2Affine) -> [[BigUint; 2]; 2] {
    if p.infinity {
        return Default::default();
    }
    [
        [fq_to_biguint(&p.x.c1), fq_to_biguint(&p.x.c0)],
        [fq_to_biguint(&p.y.c1), fq_to_biguint(&p.y.c0)],
    ]
}

fn coord(v: &BigUint, what: &'static str) -> Result<Fq, PointError> {
    fq_from_biguint(v).ok_or(PointError::CoordinateOutOfRange(what))
}

/// Parse and check an EVM-encoded G1 point.
pub fn g1_from_evm(w: &[BigUint; 2], what: &'static str) -> Result<G1Affine, PointError> {
    let (x, y) = (coord(&w[0], what)?, coord(&w[1], what)?);
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let p = G1Affine::new_unchecked(x, y);
    if !p.is_on_curve() {
        return Err(PointError::NotOnCurve(what));
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PointError::WrongSubgroup(what));
    }
    Ok(p)
}

/// Parse and check an EVM-encoded G2 point.
pub fn g2_from_evm(w: &[[BigUint; 2]; 2], what: &'static str) -> Result<G2Affine, PointError> {
    let x = Fq2::new(coord(&w[0][1], what)?, coord(&w[0][0], what)?);
    let y = Fq2::new(coord(&w[1][1], what)?, coord(&w[1][0], what)?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    let p = G2Affine::new_unchecked(x, y);
    if !p.is_on_curve() {
        return Err(PointError::NotOnCurve(what));
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PointError::WrongSubgroup(what));
    }
    Ok(p)
}

fn push_fq(out: &mut Vec<u8>, f: &Fq) {
    let bytes = f.into_bigint().to_bytes_be();
    out.extend(std::iter::repeat(0u8).take(32usize.saturating_sub(bytes.len())));
    out.extend_from_slice(&bytes);
}

/// Raw proof stream in arkworks' natural order: `A.x A.y B.x.c0 B.x.c1
/// B.y.c0 B.y.c1 C.x C.y`, 32 bytes each, big-endian. G2 components are real
/// first, so the stream is marshalled with `G2Order::RealFirst`.
#[must_use]
pub fn proof_stream(proof: &Proof<Bn254>) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    let zero = Fq::zero();
    let (ax, ay) = if proof.a.infinity { (&zero, &zero) } else { (&proof.a.x, &proof.a.y) };
    push_fq(&mut out, ax);
    push_fq(&mut out, ay);
    if proof.b.infinity {
        for _ in 0..4 {
            push_fq(&mut out, &zero);
        }
    } else {
        for f in [&proof.b.x.c0, &proof.b.x.c1, &proof.b.y.c0, &proof.b.y.c1] {
            push_fq(&mut out, f);
        }
    }
    let (cx, cy) = if proof.c.infinity { (&zero, &zero) } else { (&proof.c.x, &proof.c.y) };
    push_fq(&mut out, cx);
    push_fq(&mut out, cy);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;

    #[test]
    fn generators_roundtrip_through_evm_words() {
        let g1 = G1Affine::generator();
        assert_eq!(g1_from_evm(&g1_to_evm(&g1), "g1").unwrap(), g1);
        let g2 = G2Affine::generator();
        assert_eq!(g2_from_evm(&g2_to_evm(&g2), "g2").unwrap(), g2);
        // BN254 G1 generator is (1, 2).
        assert_eq!(g1_to_evm(&g1), [BigUint::from(1u8), BigUint::from(2u8)]);
    }

    #[test]
    fn zeros_decode_to_infinity() {
        let z = [BigUint::zero(), BigUint::zero()];
        assert!(g1_from_evm(&z, "a").unwrap().infinity);
        assert_eq!(g1_to_evm(&G1Affine::identity()), z);
    }

    #[test]
    fn off_curve_and_unreduced_points_are_rejected() {
        let bad = [BigUint::from(1u8), BigUint::from(3u8)];
        assert_eq!(g1_from_evm(&bad, "a"), Err(PointError::NotOnCurve("a")));
        let big = [base_modulus(), BigUint::from(2u8)];
        assert_eq!(
            g1_from_evm(&big, "a"),
            Err(PointError::CoordinateOutOfRange("a"))
        );
    }

    #[test]
    fn scalar_range_is_strict() {
        let r = scalar_modulus();
        assert!(fr_from_biguint(&r).is_none());
        let top = &r - 1u8;
        assert_eq!(fr_to_biguint(&fr_from_biguint(&top).unwrap()), top);
    }
}
