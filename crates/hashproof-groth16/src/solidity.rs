//! Solidity verifier export.
//!
//! The rendered contract embeds the verifying key as decimal `uint256`
//! literals and checks proofs with the BN254 precompiles (`ecAdd` 0x06,
//! `ecMul` 0x07, `ecPairing` 0x08). Entry point:
//! `verifyProof(uint256[2] a, uint256[2][2] b, uint256[2] c, uint256[N] input)`.
//!
//! [`parse_verifier_source`] reads the constants back out of a rendered
//! contract; the simulated chain uses it at deployment time.

use std::fmt::Write as _;

use num_bigint::BigUint;

use crate::keys::Groth16VerifyingKey;
use crate::points::{g1_to_evm, g2_to_evm};

/// Verifying-key constants in EVM word order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConstants {
    /// `α ∈ G1`.
    pub alpha: [BigUint; 2],
    /// `β ∈ G2`.
    pub beta: [[BigUint; 2]; 2],
    /// `γ ∈ G2`.
    pub gamma: [[BigUint; 2]; 2],
    /// `δ ∈ G2`.
    pub delta: [[BigUint; 2]; 2],
    /// Input commitment bases; `ic.len() == public inputs + 1`.
    pub ic: Vec<[BigUint; 2]>,
}

impl VerifierConstants {
    /// Extract from a verifying key.
    #[must_use]
    pub fn from_vk(vk: &Groth16VerifyingKey) -> Self {
        let vk = &vk.0;
        Self {
            alpha: g1_to_evm(&vk.alpha_g1),
            beta: g2_to_evm(&vk.beta_g2),
            gamma: g2_to_evm(&vk.gamma_g2),
            delta: g2_to_evm(&vk.delta_g2),
            ic: vk.gamma_abc_g1.iter().map(g1_to_evm).collect(),
        }
    }

    /// Number of public inputs.
    #[must_use]
    pub fn public_inputs(&self) -> usize {
        self.ic.len().saturating_sub(1)
    }
}

const PAIRING_LIBRARY: &str = r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.0;

library Pairing {
    struct G1Point {
        uint X;
        uint Y;
    }
    // Encoding of field elements is: X[0] * z + X[1]
    struct G2Point {
        uint[2] X;
        uint[2] Y;
    }

    function P1() internal pure returns (G1Point memory) {
        return G1Point(1, 2);
    }

    function P2() internal pure returns (G2Point memory) {
        return G2Point(
            [11559732032986387107991004021392285783925812861821192530917403151452391805634,
             10857046999023057135944570762232829481370756359578518086990519993285655852781],
            [4082367875863433681332203403145435568316851327593401208105741076214120093531,
             8495653923123431417604973247489272438418190587263600148770280649306958101930]
        );
    }

    function negate(G1Point memory p) internal pure returns (G1Point memory) {
        uint q = 21888242871839275222246405745257275088696311157297823662689037894645226208583;
        if (p.X == 0 && p.Y == 0) return G1Point(0, 0);
        return G1Point(p.X, q - (p.Y % q));
    }

    function addition(G1Point memory p1, G1Point memory p2) internal view returns (G1Point memory r) {
        uint[4] memory input;
        input[0] = p1.X;
        input[1] = p1.Y;
        input[2] = p2.X;
        input[3] = p2.Y;
        bool success;
        assembly {
            success := staticcall(sub(gas(), 2000), 6, input, 0xc0, r, 0x60)
            switch success case 0 { invalid() }
        }
        require(success, "pairing-add-failed");
    }

    function scalar_mul(G1Point memory p, uint s) internal view returns (G1Point memory r) {
        uint[3] memory input;
        input[0] = p.X;
        input[1] = p.Y;
        input[2] = s;
        bool success;
        assembly {
            success := staticcall(sub(gas(), 2000), 7, input, 0x80, r, 0x60)
            switch success case 0 { invalid() }
        }
        require(success, "pairing-mul-failed");
    }

    function pairing(G1Point[] memory p1, G2Point[] memory p2) internal view returns (bool) {
        require(p1.length == p2.length, "pairing-lengths-failed");
        uint elements = p1.length;
        uint inputSize = elements * 6;
        uint[] memory input = new uint[](inputSize);
        for (uint i = 0; i < elements; i++) {
            input[i * 6 + 0] = p1[i].X;
            input[i * 6 + 1] = p1[i].Y;
            input[i * 6 + 2] = p2[i].X[0];
            input[i * 6 + 3] = p2[i].X[1];
            input[i * 6 + 4] = p2[i].Y[0];
            input[i * 6 + 5] = p2[i].Y[1];
        }
        uint[1] memory out;
        bool success;
        assembly {
            success := staticcall(sub(gas(), 2000), 8, add(input, 0x20), mul(inputSize, 0x20), out, 0x20)
            switch success case 0 { invalid() }
        }
        require(success, "pairing-opcode-failed");
        return out[0] != 0;
    }

    function pairingProd4(
        G1Point memory a1, G2Point memory a2,
        G1Point memory b1, G2Point memory b2,
        G1Point memory c1, G2Point memory c2,
        G1Point memory d1, G2Point memory d2
    ) internal view returns (bool) {
        G1Point[] memory p1 = new G1Point[](4);
        G2Point[] memory p2 = new G2Point[](4);
        p1[0] = a1;
        p1[1] = b1;
        p1[2] = c1;
        p1[3] = d1;
        p2[0] = a2;
        p2[1] = b2;
        p2[2] = c2;
        p2[3] = d2;
        return pairing(p1, p2);
    }
}

contract Verifier {
    using Pairing for *;

    struct VerifyingKey {
        Pairing.G1Point alfa1;
        Pairing.G2Point beta2;
        Pairing.G2Point gamma2;
        Pairing.G2Point delta2;
        Pairing.G1Point[] IC;
    }

    struct Proof {
        Pairing.G1Point A;
        Pairing.G2Point B;
        Pairing.G1Point C;
    }
"#;

const VERIFIER_BODY: &str = r#"
    function verify(uint[] memory input, Proof memory proof) internal view returns (uint) {
        uint256 snark_scalar_field = 21888242871839275222246405745257275088548364400416034343698204186575808495617;
        VerifyingKey memory vk = verifyingKey();
        require(input.length + 1 == vk.IC.length, "verifier-bad-input");
        Pairing.G1Point memory vk_x = Pairing.G1Point(0, 0);
        for (uint i = 0; i < input.length; i++) {
            require(input[i] < snark_scalar_field, "verifier-gte-snark-scalar-field");
            vk_x = Pairing.addition(vk_x, Pairing.scalar_mul(vk.IC[i + 1], input[i]));
        }
        vk_x = Pairing.addition(vk_x, vk.IC[0]);
        if (!Pairing.pairingProd4(
            Pairing.negate(proof.A), proof.B,
            vk.alfa1, vk.beta2,
            vk_x, vk.gamma2,
            proof.C, vk.delta2
        )) return 1;
        return 0;
    }

    function verifyProof(
        uint[2] memory a,
        uint[2][2] memory b,
        uint[2] memory c,
        uint[__N_INPUTS__] memory input
    ) public view returns (bool r) {
        Proof memory proof;
        proof.A = Pairing.G1Point(a[0], a[1]);
        proof.B = Pairing.G2Point([b[0][0], b[0][1]], [b[1][0], b[1][1]]);
        proof.C = Pairing.G1Point(c[0], c[1]);
        uint[] memory inputValues = new uint[](input.length);
        for (uint i = 0; i < input.length; i++) {
            inputValues[i] = input[i];
        }
        return verify(inputValues, proof) == 0;
    }
}
"#;

fn g1_literal(p: &[BigUint; 2]) -> String {
    format!("Pairing.G1Point(uint256({}), uint256({}))", p[0], p[1])
}

fn g2_literal(p: &[[BigUint; 2]; 2]) -> String {
    format!(
        "Pairing.G2Point([uint256({}), uint256({})], [uint256({}), uint256({})])",
        p[0][0], p[0][1], p[1][0], p[1][1]
    )
}

/// Render the verifier contract for `vk`. Deterministic in `vk`.
#[must_use]
pub fn export_verifier(vk: &Groth16VerifyingKey) -> String {
    let k = VerifierConstants::from_vk(vk);
    let mut out = String::from(PAIRING_LIBRARY);
    // Writing into a String cannot fail.
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "    function verifyingKey() internal pure returns (VerifyingKey memory vk) {{"
    );
    let _ = writeln!(out, "        vk.alfa1 = {};", g1_literal(&k.alpha));
    let _ = writeln!(out, "        vk.beta2 = {};", g2_literal(&k.beta));
    let _ = writeln!(out, "        vk.gamma2 = {};", g2_literal(&k.gamma));
    let _ = writeln!(out, "        vk.delta2 = {};", g2_literal(&k.delta));
    let _ = writeln!(out, "        vk.IC = new Pairing.G1Point[]({});", k.ic.len());
    for (i, p) in k.ic.iter().enumerate() {
        let _ = writeln!(out, "        vk.IC[{i}] = {};", g1_literal(p));
    }
    let _ = writeln!(out, "    }}");
    out.push_str(&VERIFIER_BODY.replace("__N_INPUTS__", &k.public_inputs().to_string()));
    out
}

/// Every decimal literal wrapped in `uint256(..)` on `line`.
fn uint_literals(line: &str) -> Result<Vec<BigUint>, String> {
    line.split("uint256(")
        .skip(1)
        .map(|rest| {
            let digits = rest
                .split(')')
                .next()
                .ok_or_else(|| format!("unterminated literal in `{line}`"))?;
            BigUint::parse_bytes(digits.trim().as_bytes(), 10)
                .ok_or_else(|| format!("bad uint256 literal `{digits}`"))
        })
        .collect()
}

fn g1_from(line: &str) -> Result<[BigUint; 2], String> {
    let v = uint_literals(line)?;
    match <[BigUint; 2]>::try_from(v) {
        Ok(p) => Ok(p),
        Err(v) => Err(format!("G1 literal needs 2 words, found {}", v.len())),
    }
}

fn g2_from(line: &str) -> Result<[[BigUint; 2]; 2], String> {
    let v = uint_literals(line)?;
    match <[BigUint; 4]>::try_from(v) {
        Ok([a, b, c, d]) => Ok([[a, b], [c, d]]),
        Err(v) => Err(format!("G2 literal needs 4 words, found {}", v.len())),
    }
}

/// Recover the verifying-key constants from rendered verifier source.
///
/// # Errors
/// A description of the first missing or malformed piece: no `verifyProof`
/// entry point, a missing key member, or an `IC` table that is incomplete or
/// does not match the declared input arity.
pub fn parse_verifier_source(src: &str) -> Result<VerifierConstants, String> {
    if !src.contains("function verifyProof(") {
        return Err("no verifyProof entry point".into());
    }
    let (mut alpha, mut beta, mut gamma, mut delta) = (None, None, None, None);
    let mut ic_len: Option<usize> = None;
    let mut ic: Vec<Option<[BigUint; 2]>> = Vec::new();

    for line in src.lines().map(str::trim) {
        if line.starts_with("vk.alfa1 =") {
            alpha = Some(g1_from(line)?);
        } else if line.starts_with("vk.beta2 =") {
            beta = Some(g2_from(line)?);
        } else if line.starts_with("vk.gamma2 =") {
            gamma = Some(g2_from(line)?);
        } else if line.starts_with("vk.delta2 =") {
            delta = Some(g2_from(line)?);
        } else if let Some(rest) = line.strip_prefix("vk.IC = new Pairing.G1Point[](") {
            let n = rest
                .split(')')
                .next()
                .and_then(|d| d.trim().parse().ok())
                .ok_or_else(|| format!("bad IC length in `{line}`"))?;
            ic_len = Some(n);
            ic = vec![None; n];
        } else if let Some(rest) = line.strip_prefix("vk.IC[") {
            let i: usize = rest
                .split(']')
                .next()
                .and_then(|d| d.trim().parse().ok())
                .ok_or_else(|| format!("bad IC index in `{line}`"))?;
            let slot = ic
                .get_mut(i)
                .ok_or_else(|| format!("IC index {i} outside the declared table"))?;
            *slot = Some(g1_from(line)?);
        }
    }

    let missing = |what: &str| format!("verifying key has no {what}");
    let n = ic_len.ok_or_else(|| missing("IC table"))?;
    if n == 0 {
        return Err("IC table is empty".into());
    }
    let ic = ic
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.ok_or_else(|| format!("IC[{i}] is not set")))
        .collect::<Result<Vec<_>, _>>()?;

    let declared = format!("uint[{}] memory input", n - 1);
    if !src.contains(&declared) {
        return Err(format!("entry point arity does not match {n} IC points"));
    }

    Ok(VerifierConstants {
        alpha: alpha.ok_or_else(|| missing("alfa1"))?,
        beta: beta.ok_or_else(|| missing("beta2"))?,
        gamma: gamma.ok_or_else(|| missing("gamma2"))?,
        delta: delta.ok_or_else(|| missing("delta2"))?,
        ic,
    })
}
