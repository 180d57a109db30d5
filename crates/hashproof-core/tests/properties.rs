#![allow(clippy::unwrap_used)]
//! Property tests for witness range checks and proof marshalling.

use hashproof_core::{
    CallData, Curve, Error, FieldElement, G2Order, Marshaller, ProofLayout, WitnessBuilder,
    WitnessError,
};
use num_bigint::BigUint;
use proptest::prelude::*;

/// BN254 scalar-field modulus.
fn bn254_r() -> BigUint {
    BigUint::parse_bytes(
        b"21888242871839275222246405745257275088548364400416034343698204186575808495617",
        10,
    )
    .unwrap()
}

fn layout(order: G2Order) -> ProofLayout {
    ProofLayout::for_curve(Curve::Bn254, order)
}

proptest! {
    #[test]
    fn marshal_then_reslice_is_identity(
        raw in proptest::collection::vec(any::<u8>(), 256),
        real_first in any::<bool>(),
        input in any::<u64>(),
    ) {
        let order = if real_first { G2Order::RealFirst } else { G2Order::ImaginaryFirst };
        let b = WitnessBuilder::new(bn254_r());
        let x = b.element_from_u64("digest", input).unwrap();
        let cd = Marshaller::new(layout(order), 1).marshal(&raw, &[x]).unwrap();
        prop_assert_eq!(cd.to_proof_bytes(&layout(order)).unwrap(), raw);
        prop_assert_eq!(cd.input, vec![BigUint::from(input)]);
    }

    #[test]
    fn every_abi_word_is_exactly_32_bytes(
        raw in proptest::collection::vec(any::<u8>(), 256),
        input in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let b = WitnessBuilder::new(bn254_r());
        // 31 bytes always fits below r.
        let x = b.field_element("digest", &input[..input.len().min(31)]).unwrap();
        let cd = Marshaller::new(layout(G2Order::RealFirst), 1).marshal(&raw, &[x]).unwrap();
        let enc = cd.abi_encode().unwrap();
        prop_assert_eq!(enc.len(), 4 + 9 * 32);
        prop_assert_eq!(CallData::abi_decode(&enc, 1).unwrap(), cd);
    }

    #[test]
    fn marshalling_is_deterministic(raw in proptest::collection::vec(any::<u8>(), 256)) {
        let b = WitnessBuilder::new(bn254_r());
        let m = Marshaller::new(layout(G2Order::RealFirst), 1);
        let one = m.marshal(&raw, &[b.element_from_u64("digest", 7).unwrap()]).unwrap();
        let two = m.marshal(&raw, &[b.element_from_u64("digest", 7).unwrap()]).unwrap();
        prop_assert_eq!(one, two);
    }

    #[test]
    fn any_wrong_stream_length_is_rejected(len in 0usize..600) {
        prop_assume!(len != 256);
        let b = WitnessBuilder::new(bn254_r());
        let err = Marshaller::new(layout(G2Order::RealFirst), 1)
            .marshal(&vec![0; len], &[b.element_from_u64("digest", 1).unwrap()])
            .unwrap_err();
        let is_length_mismatch = matches!(err, Error::ProofLengthMismatch { expected: 256, got } if got == len);
        prop_assert!(is_length_mismatch);
    }

    #[test]
    fn values_at_or_above_r_never_enter_a_witness(offset in any::<u64>()) {
        let r = bn254_r();
        let b = WitnessBuilder::new(r.clone());
        let v = (r + offset).to_bytes_be();
        prop_assert_eq!(
            b.build(&v, &[1]).unwrap_err(),
            WitnessError::ValueOutOfRange { field: "secret" }
        );
    }

    #[test]
    fn values_below_r_are_accepted(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
        let r = bn254_r();
        let v = BigUint::from_bytes_be(&bytes);
        prop_assume!(v < r);
        let e = WitnessBuilder::new(r.clone()).field_element("secret", &bytes).unwrap();
        prop_assert_eq!(e.as_biguint(), &v);
        prop_assert!(FieldElement::new_checked(v, &r).is_some());
    }
}
