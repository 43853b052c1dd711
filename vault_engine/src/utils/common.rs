//! Common utility and helper functions that are used across the project

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use candid::Nat;
use num_bigint::BigUint;

use crate::constants::bps_denominator;

use super::error::*;

/// Returns `a * b / denominator`, rounded down.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> VaultResult<U256> {
    if denominator.is_zero() {
        return Err(arithmetic_err("Division by zero in mul_div."));
    }
    let product = a
        .checked_mul(b)
        .ok_or_else(|| arithmetic_err("mul_div product overflowed."))?;
    Ok(product / denominator)
}

/// Returns `a * b / denominator`, rounded up.
pub fn mul_div_up(a: U256, b: U256, denominator: U256) -> VaultResult<U256> {
    if denominator.is_zero() {
        return Err(arithmetic_err("Division by zero in mul_div_up."));
    }
    let product = a
        .checked_mul(b)
        .ok_or_else(|| arithmetic_err("mul_div_up product overflowed."))?;
    let quotient = product / denominator;
    if (product % denominator).is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U256::from(1))
    }
}

/// Returns the `bps` basis-point portion of `amount`, rounded down.
pub fn apply_bps(amount: U256, bps: u64) -> VaultResult<U256> {
    mul_div(amount, U256::from(bps), bps_denominator())
}

/// Checked addition that reports which quantity overflowed.
pub fn checked_add(a: U256, b: U256, what: &str) -> VaultResult<U256> {
    a.checked_add(b)
        .ok_or_else(|| arithmetic_err(format!("{} overflowed.", what)))
}

/// Checked subtraction that reports which quantity underflowed.
pub fn checked_sub(a: U256, b: U256, what: &str) -> VaultResult<U256> {
    a.checked_sub(b)
        .ok_or_else(|| arithmetic_err(format!("{} underflowed.", what)))
}

/// Converts String to Address and returns VaultError on failure
pub fn string_to_address(input: &str) -> VaultResult<Address> {
    Address::from_str(input).map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))
}

/// Converts values of type `U256` to `Nat`
pub fn u256_to_nat(value: &U256) -> Nat {
    let be_bytes: [u8; 32] = value.to_be_bytes();
    Nat(BigUint::from_bytes_be(&be_bytes))
}

/// Converts values of type `Nat` to `U256`
pub fn nat_to_u256(n: &Nat) -> VaultResult<U256> {
    let be_bytes = n.0.to_bytes_be();
    if be_bytes.len() > 32 {
        return Err(VaultError::DecodingError("The `Nat` input length exceedes 32 bytes when converted to big-endian bytes representation.".to_string()));
    }
    // Ensure the byte array is exactly 32 bytes long
    let mut padded_bytes = [0u8; 32];
    let start_pos = 32 - be_bytes.len();
    padded_bytes[start_pos..].copy_from_slice(&be_bytes);

    Ok(U256::from_be_bytes(padded_bytes))
}

/// Parses a decimal (or `0x`-prefixed hexadecimal) string into `U256`
pub fn string_to_u256(input: &str) -> VaultResult<U256> {
    U256::from_str(input).map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))
}
