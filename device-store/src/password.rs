//! Salted password digests.
//!
//! Stored form: `v1$<salt_b64>$<digest_b64>` where
//! `digest = sha256(salt || password)`.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const VERSION: &str = "v1";
const SALT_LEN: usize = 16;

/// Digest a plaintext password under a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = digest_with_salt(&salt, password);
    format!(
        "{VERSION}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(digest)
    )
}

/// Check `candidate` against a stored digest in constant time.
/// Malformed stored values verify as false rather than erroring.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(version), Some(salt_b64), Some(digest_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if version != VERSION {
        return false;
    }
    let Ok(salt) = STANDARD.decode(salt_b64) else {
        return false;
    };
    let Ok(expected) = STANDARD.decode(digest_b64) else {
        return false;
    };
    let actual = digest_with_salt(&salt, candidate);
    expected.ct_eq(actual.as_slice()).into()
}

fn digest_with_salt(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let stored = hash_password("hunter2");
        assert!(verify_password(&stored, "hunter2"));
        assert!(!verify_password(&stored, "hunter3"));
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password(&a, "same"));
        assert!(verify_password(&b, "same"));
    }

    #[test]
    fn malformed_stored_values_never_verify() {
        assert!(!verify_password("", "pw"));
        assert!(!verify_password("v1$onlysalt", "pw"));
        assert!(!verify_password("v2$QUFBQQ==$QUFBQQ==", "pw"));
        assert!(!verify_password("v1$!!!$QUFBQQ==", "pw"));
        assert!(!verify_password("v1$QUFBQQ==$QUFBQQ==$extra", "pw"));
    }
}
