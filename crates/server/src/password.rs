//! Salted password hashing
//!
//! PBKDF2-HMAC-SHA256 with a per-user random salt. Stored form:
//! `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = derive(password, &salt, ITERATIONS);
    format!(
        "pbkdf2-sha256${}${}${}",
        ITERATIONS,
        BASE64.encode(salt),
        BASE64.encode(key)
    )
}

/// Verify a password against a stored hash. Malformed stored values
/// verify as false rather than erroring.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some("pbkdf2-sha256"), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
        return false;
    };

    let key = derive(password, &salt, iterations);

    // Constant-time-ish comparison: fold the byte differences.
    expected.len() == KEY_LEN
        && key
            .iter()
            .zip(&expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let stored = hash_password("hemligt");
        assert!(verify_password("hemligt", &stored));
        assert!(!verify_password("fel", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_stored_value_verifies_false() {
        assert!(!verify_password("x", "plaintext-from-old-system"));
        assert!(!verify_password("x", "pbkdf2-sha256$notanumber$AA$AA"));
        assert!(!verify_password("x", ""));
    }
}
