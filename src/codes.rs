//! Box identifiers.
//!
//! Every box carries two identifiers: a ULID primary key (`BoxId`) and a
//! short human-typable code printed next to the QR label. Codes are random
//! and carry no uniqueness guarantee on their own; callers must check the
//! store and regenerate on collision.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use std::{fmt::Display, ops::Deref};
use ulid::Ulid;

/// Code alphabet: digits 2-9 and uppercase letters without I and O,
/// so a printed code can't be misread as containing 0 or 1.
pub const CODE_ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Length of a box code in characters.
pub const CODE_LENGTH: usize = 4;

/// Generate a random box code.
///
/// Uniform over the 32-symbol alphabet, ~1M combinations at length 4.
/// Stateless: uniqueness is the caller's job (generate, look up, retry).
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Normalize user- or scanner-supplied code input before lookup.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Primary key of a box record. ULID string under the hood.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct BoxId(String);

impl BoxId {
    #[inline]
    pub fn new() -> BoxId {
        BoxId(Ulid::new().to_string())
    }
}

impl Default for BoxId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for BoxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BoxId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BoxId(s.to_string()))
    }
}

impl Deref for BoxId {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for BoxId {
    fn from(fr: &str) -> Self {
        BoxId(fr.to_string())
    }
}

impl From<String> for BoxId {
    fn from(fr: String) -> Self {
        BoxId(fr)
    }
}

impl From<BoxId> for String {
    fn from(fr: BoxId) -> Self {
        fr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_use_fixed_length_and_alphabet() {
        for _ in 0..10_000 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(
                code.bytes().all(|b| CODE_ALPHABET.contains(&b)),
                "code {} contains a symbol outside the alphabet",
                code
            );
        }
    }

    #[test]
    fn test_codes_never_contain_ambiguous_glyphs() {
        for _ in 0..10_000 {
            let code = generate_code();
            assert!(!code.contains(['0', '1', 'I', 'O']));
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab12\n"), "AB12");
        assert_eq!(normalize_code("XY9Z"), "XY9Z");
    }

    #[test]
    fn test_box_ids_are_unique() {
        let a = BoxId::new();
        let b = BoxId::new();
        assert_ne!(a, b);
    }
}
