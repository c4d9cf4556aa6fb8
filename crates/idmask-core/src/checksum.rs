// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verhoeff check-digit validation for 12-digit identity numbers.
//
// The two tables below are an external contract and must stay bit-exact.

use crate::error::{MaskError, Result};

/// Number of digits in an identity number.
pub const ID_DIGITS: usize = 12;

/// Dihedral-group multiplication table, indexed `[checksum][permuted digit]`.
const MULTIPLICATION: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

/// Position permutation table, indexed `[position mod 8][digit]`.
const PERMUTATION: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 6, 8, 7, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

/// Multiplicative inverses in the dihedral group, used to derive a check digit.
const INVERSE: [u8; 10] = [0, 4, 3, 2, 1, 5, 6, 7, 8, 9];

/// Running Verhoeff checksum over `digits`, read right to left, with the
/// position index shifted by `offset`.
fn fold(digits: &[u8], offset: usize) -> u8 {
    digits
        .iter()
        .rev()
        .enumerate()
        .fold(0u8, |checksum, (i, &digit)| {
            MULTIPLICATION[checksum as usize][PERMUTATION[(i + offset) % 8][digit as usize] as usize]
        })
}

/// Parse `input` into decimal digit values, requiring exactly `len` ASCII digits.
fn parse_digits(input: &str, len: usize) -> Result<Vec<u8>> {
    if input.len() != len || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MaskError::Format(format!(
            "expected exactly {len} decimal digits, got {} characters",
            input.chars().count()
        )));
    }
    Ok(input.bytes().map(|b| b - b'0').collect())
}

/// Compute the Verhoeff checksum of a 12-digit identity number.
///
/// Returns `0` for an authentic number.
///
/// # Errors
///
/// Returns [`MaskError::Format`] if `number` is not exactly 12 ASCII digits.
pub fn compute_checksum(number: &str) -> Result<u8> {
    let digits = parse_digits(number, ID_DIGITS)?;
    Ok(fold(&digits, 0))
}

/// Validate a 12-digit identity number against its Verhoeff check digit.
///
/// # Errors
///
/// Returns [`MaskError::Format`] if `number` is not exactly 12 ASCII digits.
pub fn is_valid(number: &str) -> Result<bool> {
    Ok(compute_checksum(number)? == 0)
}

/// Derive the check digit that completes an 11-digit prefix into a valid
/// identity number.
pub fn check_digit(prefix: &str) -> Result<u8> {
    let digits = parse_digits(prefix, ID_DIGITS - 1)?;
    Ok(INVERSE[fold(&digits, 1) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_valid_numbers() {
        assert!(is_valid("123456789010").unwrap());
        assert!(is_valid("234123412346").unwrap());
        assert!(is_valid("499118665246").unwrap());
    }

    #[test]
    fn known_invalid_number() {
        assert_eq!(compute_checksum("123456789012").unwrap(), 2);
        assert!(!is_valid("123456789012").unwrap());
    }

    #[test]
    fn check_digit_completes_prefix() {
        for prefix in ["12345678901", "23412341234", "99999999999", "00000000000"] {
            let digit = check_digit(prefix).unwrap();
            let full = format!("{prefix}{digit}");
            assert!(is_valid(&full).unwrap(), "{full} should validate");
        }
    }

    #[test]
    fn every_single_digit_mutation_is_detected() {
        let number = "499118665246";
        for position in 0..ID_DIGITS {
            for replacement in b'0'..=b'9' {
                let mut bytes = number.as_bytes().to_vec();
                if bytes[position] == replacement {
                    continue;
                }
                bytes[position] = replacement;
                let mutated = String::from_utf8(bytes).unwrap();
                assert!(
                    !is_valid(&mutated).unwrap(),
                    "mutation at {position} to {} went undetected",
                    replacement as char
                );
            }
        }
    }

    #[test]
    fn adjacent_transposition_is_detected() {
        // 4 and 9 at positions 0/1 swapped.
        assert!(!is_valid("949118665246").unwrap());
    }

    #[test]
    fn rejects_wrong_length_and_non_digits() {
        assert!(matches!(is_valid("12345678901"), Err(MaskError::Format(_))));
        assert!(matches!(is_valid("1234567890123"), Err(MaskError::Format(_))));
        assert!(matches!(is_valid("1234 5678 901"), Err(MaskError::Format(_))));
        assert!(matches!(is_valid("12345678901a"), Err(MaskError::Format(_))));
        assert!(matches!(is_valid("١٢٣٤٥٦٧٨٩٠١٠"), Err(MaskError::Format(_))));
    }
}
