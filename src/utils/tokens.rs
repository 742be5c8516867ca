use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of a message body, stored with every notification.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Magic-link tokens are stored only as their SHA-256 hash.
pub fn hash_token(token: &str) -> String {
    content_hash(token)
}

/// URL-safe random token carrying `bytes` bytes of entropy.
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(buf.as_mut_slice());
    URL_SAFE_NO_PAD.encode(buf)
}

/// Uppercase alphanumeric code, used for scholarship links.
pub fn generate_code(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_hex() {
        let h = content_hash("hello");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_generate_token_length() {
        // 48 bytes -> 64 base64 characters without padding
        let t = generate_token(48);
        assert_eq!(t.len(), 64);
        assert!(!t.contains('=') && !t.contains('+') && !t.contains('/'));
        assert_ne!(generate_token(48), t);
    }

    #[test]
    fn test_generate_code() {
        let code = generate_code(8);
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
