//! API credential generation and digests.
//!
//! A credential is `ub_` followed by 64 lowercase hex characters (32 random
//! bytes from the OS). Only its SHA-256 digest is ever stored.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

pub const CREDENTIAL_PREFIX: &str = "ub_";

const SECRET_BYTES: usize = 32;

/// Generate a fresh plaintext credential.
pub fn generate() -> String {
    let mut secret = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut secret);
    format!("{}{}", CREDENTIAL_PREFIX, hex::encode(secret))
}

/// SHA-256 of `credential`, as 32 raw bytes.
pub fn digest(credential: &str) -> [u8; 32] {
    Sha256::digest(credential.as_bytes()).into()
}

/// True if `credential` has the shape of one issued by [`generate`].
pub fn is_well_formed(credential: &str) -> bool {
    credential
        .strip_prefix(CREDENTIAL_PREFIX)
        .map(|rest| {
            rest.len() == SECRET_BYTES * 2
                && rest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
        .unwrap_or(false)
}

/// Compare two digests without an early exit on the first differing byte.
pub fn digests_equal(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
