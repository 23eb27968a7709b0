//! SHA-256 hex digests for stored password hashes.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Digest a plaintext password the way the `user` entity stores it.
pub fn hash_password(password: &str) -> String {
    sha256_hex(password.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn password_hash_is_stable_hex() {
        let hash = hash_password("hunter2");
        assert_eq!(hash, hash_password("hunter2"));
        assert_ne!(hash, hash_password("Hunter2"));
        assert_eq!(hash.len(), 64);
    }
}
