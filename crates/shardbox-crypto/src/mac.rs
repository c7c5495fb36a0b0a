//! HMAC-SHA256 manifest signing

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// HMAC-SHA256 output length in bytes.
pub const MAC_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 of `data` under `key` (the raw master key bytes).
pub fn sign(data: &[u8], key: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time verification. Returns `false` on any mismatch, including
/// a wrong-length tag; never panics.
pub fn verify(data: &[u8], tag: &[u8], key: &[u8]) -> bool {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let key = [7u8; 32];
        let tag = sign(b"manifest bytes", &key);

        assert_eq!(tag.len(), MAC_SIZE);
        assert!(verify(b"manifest bytes", &tag, &key));
    }

    #[test]
    fn test_tampered_data_fails() {
        let key = [7u8; 32];
        let tag = sign(b"manifest bytes", &key);
        assert!(!verify(b"manifest bytez", &tag, &key));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = [7u8; 32];
        let mut tag = sign(b"manifest bytes", &key);
        tag[0] ^= 0x01;
        assert!(!verify(b"manifest bytes", &tag, &key));
    }

    #[test]
    fn test_wrong_key_fails() {
        let tag = sign(b"manifest bytes", &[7u8; 32]);
        assert!(!verify(b"manifest bytes", &tag, &[8u8; 32]));
    }

    #[test]
    fn test_truncated_tag_fails() {
        let key = [7u8; 32];
        let tag = sign(b"manifest bytes", &key);
        assert!(!verify(b"manifest bytes", &tag[..16], &key));
        assert!(!verify(b"manifest bytes", &[], &key));
    }
}
