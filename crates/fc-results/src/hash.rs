//! Content hashing for cached result archives.

use sha2::{Digest, Sha256};

pub fn archive_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_stability() {
        assert_eq!(archive_digest(b"PK\x03\x04"), archive_digest(b"PK\x03\x04"));
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        assert_ne!(archive_digest(b"run-a"), archive_digest(b"run-b"));
    }

    #[test]
    fn empty_input_is_known_digest() {
        assert_eq!(
            archive_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
