//! Witness construction.
//!
//! The builder reads raw byte strings as big-endian integers and rejects any
//! value that is not strictly below the scalar-field modulus. It never
//! computes the digest: callers hash the secret with the same function the
//! circuit encodes (see [`crate::ProvingSystem::digest`]). A witness whose
//! digest is wrong is still well-formed; proving it fails later with
//! `UnsatisfiedConstraint`.

use num_bigint::BigUint;
use std::fmt;

use crate::error::WitnessError;
use crate::field::FieldElement;

/// Assignment of the secret and public fields for one proof request.
///
/// Deliberately neither `Clone` nor `Serialize`: a witness lives for one
/// request and is consumed by proving. `Debug` redacts the secret.
pub struct Witness {
    secret: FieldElement,
    public: FieldElement,
}

impl Witness {
    /// The secret preimage.
    #[must_use]
    pub const fn secret(&self) -> &FieldElement {
        &self.secret
    }

    /// The claimed digest (the only public input).
    #[must_use]
    pub const fn public(&self) -> &FieldElement {
        &self.public
    }

    /// Public inputs in verifying-key order.
    #[must_use]
    pub fn public_inputs(&self) -> Vec<FieldElement> {
        vec![self.public.clone()]
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("secret", &"<redacted>")
            .field("public", &self.public)
            .finish()
    }
}

/// Maps raw values into range-checked field elements.
#[derive(Debug, Clone)]
pub struct WitnessBuilder {
    modulus: BigUint,
}

impl WitnessBuilder {
    /// Builder for a scalar field with the given modulus.
    #[must_use]
    pub const fn new(modulus: BigUint) -> Self {
        Self { modulus }
    }

    /// The modulus values are checked against.
    #[must_use]
    pub const fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Read `bytes` as a big-endian integer and range-check it.
    ///
    /// `field` names the value in the error.
    pub fn field_element(
        &self,
        field: &'static str,
        bytes: &[u8],
    ) -> Result<FieldElement, WitnessError> {
        self.check(field, BigUint::from_bytes_be(bytes))
    }

    /// Range-check a small integer (handy for public inputs such as `42`).
    pub fn element_from_u64(
        &self,
        field: &'static str,
        value: u64,
    ) -> Result<FieldElement, WitnessError> {
        self.check(field, BigUint::from(value))
    }

    /// Build a witness from raw secret and digest bytes.
    pub fn build(&self, secret: &[u8], digest: &[u8]) -> Result<Witness, WitnessError> {
        let secret = self.field_element("secret", secret)?;
        let public = self.field_element("digest", digest)?;
        Ok(Witness { secret, public })
    }

    /// Build a witness from already-constructed elements, re-checking both
    /// against this builder's modulus.
    pub fn assemble(
        &self,
        secret: FieldElement,
        digest: FieldElement,
    ) -> Result<Witness, WitnessError> {
        let secret = self.check("secret", secret.into_biguint())?;
        let public = self.check("digest", digest.into_biguint())?;
        Ok(Witness { secret, public })
    }

    fn check(&self, field: &'static str, v: BigUint) -> Result<FieldElement, WitnessError> {
        FieldElement::new_checked(v, &self.modulus).ok_or(WitnessError::ValueOutOfRange { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> WitnessBuilder {
        WitnessBuilder::new(BigUint::from(65_521u32))
    }

    #[test]
    fn reads_big_endian() {
        let e = builder().field_element("x", &[0x01, 0x00]).unwrap();
        assert_eq!(e.as_biguint(), &BigUint::from(256u32));
    }

    #[test]
    fn modulus_itself_is_out_of_range() {
        let b = builder();
        let m = b.modulus().to_bytes_be();
        assert_eq!(
            b.field_element("digest", &m).unwrap_err(),
            WitnessError::ValueOutOfRange { field: "digest" }
        );
        let below = (b.modulus() - 1u32).to_bytes_be();
        assert!(b.field_element("digest", &below).is_ok());
    }

    #[test]
    fn build_names_the_offending_field() {
        let b = builder();
        let err = b.build(&[0xff, 0xff, 0xff], &[1]).unwrap_err();
        assert_eq!(err, WitnessError::ValueOutOfRange { field: "secret" });
        let err = b.build(&[1], &[0xff, 0xff, 0xff]).unwrap_err();
        assert_eq!(err, WitnessError::ValueOutOfRange { field: "digest" });
    }

    #[test]
    fn empty_bytes_are_zero() {
        let w = builder().build(&[], &[]).unwrap();
        assert_eq!(w.secret().as_biguint(), &BigUint::from(0u8));
    }

    #[test]
    fn debug_does_not_leak_the_secret() {
        let w = builder().build(&[0x12, 0x34], &[7]).unwrap();
        let dbg = format!("{w:?}");
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("1234"));
    }

    #[test]
    fn assemble_rechecks_against_this_modulus() {
        let wide = WitnessBuilder::new(BigUint::from(1_000_000u32));
        let big = wide.element_from_u64("secret", 70_000).unwrap();
        let small = wide.element_from_u64("digest", 1).unwrap();
        assert!(builder().assemble(big, small).is_err());
    }
}
