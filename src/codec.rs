//! Reversible mapping between record identifiers and auto-generated paths
//!
//! Identifiers are written as a positional numeral in base 32, most
//! significant digit first. The alphabet uses uppercase letters and digits
//! only, minus the look-alikes `0`, `O`, `1` and `I`, so every encoded path
//! is unambiguous when read aloud or typed, and can never collide with a
//! manual path (those always start with a lowercase letter).

/// Digits of the numeral system, in value order
pub const ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

const BASE: u64 = ALPHABET.len() as u64;

/// Encodes a record identifier as a short path.
///
/// `0` encodes to the single zero digit (`"2"`), never to an empty string.
///
/// ```
/// # use chatlink::codec::{decode, encode};
/// assert_eq!(encode(0), "2");
/// assert_eq!(decode(&encode(4242)), Some(4242));
/// ```
pub fn encode(mut id: u64) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(ALPHABET[(id % BASE) as usize]);
        id /= BASE;
        if id == 0 {
            break;
        }
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

/// Decodes a path produced by [`encode`].
///
/// Returns `None` for anything `encode` cannot produce: the empty string,
/// characters outside [`ALPHABET`], redundant leading zero digits, and
/// values that overflow `u64`.
pub fn decode(path: &str) -> Option<u64> {
    let bytes = path.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == ALPHABET[0]) {
        return None;
    }

    bytes.iter().try_fold(0u64, |acc, &b| {
        let digit = digit_value(b)?;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}

fn digit_value(b: u8) -> Option<u64> {
    ALPHABET.iter().position(|&c| c == b).map(|pos| pos as u64)
}
