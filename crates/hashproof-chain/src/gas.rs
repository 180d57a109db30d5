//! Gas schedule (Istanbul pricing for the BN254 precompiles).

/// Intrinsic cost of any transaction.
pub const TX_BASE: u64 = 21_000;
/// Per zero byte of calldata.
pub const CALLDATA_ZERO_BYTE: u64 = 4;
/// Per non-zero byte of calldata.
pub const CALLDATA_NONZERO_BYTE: u64 = 16;
/// Contract creation surcharge.
pub const CREATE: u64 = 32_000;
/// Code deposit, per byte of deployed code.
pub const CODE_DEPOSIT_PER_BYTE: u64 = 200;
/// `ecAdd` precompile.
pub const EC_ADD: u64 = 150;
/// `ecMul` precompile.
pub const EC_MUL: u64 = 6_000;
/// `ecPairing` base cost.
pub const PAIRING_BASE: u64 = 45_000;
/// `ecPairing` per pair.
pub const PAIRING_PER_PAIR: u64 = 34_000;

/// Intrinsic calldata cost.
#[must_use]
pub fn calldata(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .map(|&b| if b == 0 { CALLDATA_ZERO_BYTE } else { CALLDATA_NONZERO_BYTE })
        .sum()
}

/// Cost of deploying `code_len` bytes of code.
#[must_use]
pub const fn deployment(code_len: usize) -> u64 {
    TX_BASE + CREATE + CODE_DEPOSIT_PER_BYTE * code_len as u64
}

/// Cost of one `verifyProof` call with `inputs` public inputs.
///
/// One `ecMul` and `ecAdd` per input, one `ecAdd` for `IC[0]`, one
/// four-pair pairing check.
#[must_use]
pub fn verify_call(payload: &[u8], inputs: usize) -> u64 {
    let inputs = inputs as u64;
    TX_BASE
        + calldata(payload)
        + inputs * (EC_MUL + EC_ADD)
        + EC_ADD
        + PAIRING_BASE
        + 4 * PAIRING_PER_PAIR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_input_verify_fits_the_default_block() {
        let payload = vec![1u8; 4 + 9 * 32];
        let g = verify_call(&payload, 1);
        assert_eq!(g, 21_000 + 16 * 292 + 6_150 + 150 + 45_000 + 136_000);
        assert!(g < crate::DEFAULT_GAS_LIMIT);
    }

    #[test]
    fn zero_bytes_are_cheaper() {
        assert_eq!(calldata(&[0, 0, 1]), 24);
    }
}
