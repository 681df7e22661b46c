use base64::Engine;
use sha2::{Digest, Sha256};

/// SHA-256 of the raw bytes, URL-safe base64 without padding so the value
/// can sit in a URL path segment unescaped.
pub fn compute_fingerprint(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(compute_fingerprint(b"abc"), compute_fingerprint(b"abc"));
        assert_ne!(compute_fingerprint(b"abc"), compute_fingerprint(b"abd"));
    }

    #[test]
    fn fingerprint_has_sha256_length() {
        // 32 bytes → 43 base64 chars without padding
        assert_eq!(compute_fingerprint(b"").len(), 43);
    }

    #[test]
    fn known_digest() {
        // SHA-256("abc") = ba7816bf...
        assert_eq!(
            compute_fingerprint(b"abc"),
            "ungWv48Bz-pBQUDeXa4iI7ADYaOWF3qctBD_YfIAFa0"
        );
    }
}
