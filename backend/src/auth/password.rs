//! Salted password hashing: hex(SHA-256(salt || password)).

use rand::Rng;
use sha2::{Digest, Sha256};

/// Random 32-hex-character salt.
pub fn generate_salt() -> String {
    let value: u128 = rand::rng().random();
    format!("{value:032x}")
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}
