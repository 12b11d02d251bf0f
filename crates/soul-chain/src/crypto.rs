//! Per-blob AES-256-GCM encryption. Blob layout: 12B nonce ‖ 16B tag ‖
//! ciphertext. A fresh random nonce is generated per call so encrypting
//! the same plaintext twice never produces the same blob.

use ring::aead::{self, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use soul_core::error::{Error, Result};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

struct FixedNonce(Option<[u8; NONCE_LEN]>);
impl NonceSequence for FixedNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        let bytes = self.0.take().ok_or(ring::error::Unspecified)?;
        Ok(Nonce::assume_unique_for_key(bytes))
    }
}

/// Encrypt `plaintext` under `key`, returning `nonce ‖ tag ‖ ciphertext`.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| Error::Other("failed to generate nonce".to_string()))?;

    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| Error::Other("invalid aead key".to_string()))?;
    let mut sealing_key = aead::SealingKey::new(unbound, FixedNonce(Some(nonce_bytes)));

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(aead::Aad::empty(), &mut in_out)
        .map_err(|_| Error::Other("encryption failed".to_string()))?;

    // `in_out` is now ciphertext ‖ tag (ring's layout); the wire layout
    // puts the tag before the ciphertext, so split and reorder.
    let tag_start = in_out.len() - TAG_LEN;
    let (ciphertext, tag) = in_out.split_at(tag_start);

    let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(tag);
    out.extend_from_slice(ciphertext);
    Ok(out)
}

/// Decrypt a blob of the form `nonce ‖ tag ‖ ciphertext`. Any failure —
/// truncated blob, wrong key, tampered tag — surfaces as `AuthFailed`; the
/// caller drops the file rather than treating this as fatal.
pub fn decrypt(key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::AuthFailed);
    }
    let (nonce_bytes, rest) = blob.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(nonce_bytes);

    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| Error::AuthFailed)?;
    let mut opening_key = aead::OpeningKey::new(unbound, FixedNonce(Some(nonce)));

    // ring expects ciphertext ‖ tag; reassemble from the wire's tag-first
    // layout before handing it in_out.
    let mut in_out = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);

    let plaintext = opening_key
        .open_in_place(aead::Aad::empty(), &mut in_out)
        .map_err(|_| Error::AuthFailed)?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_encryption() {
        let key = [9u8; 32];
        let blob = encrypt(&key, b"hello world").unwrap();
        let plaintext = decrypt(&key, &blob).unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[test]
    fn re_encrypting_produces_different_ciphertext() {
        let key = [9u8; 32];
        let a = encrypt(&key, b"hello world").unwrap();
        let b = encrypt(&key, b"hello world").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let key_a = [1u8; 32];
        let key_b = [2u8; 32];
        let blob = encrypt(&key_a, b"secret").unwrap();
        let err = decrypt(&key_b, &blob).unwrap_err();
        assert!(matches!(err, Error::AuthFailed));
    }

    #[test]
    fn truncated_blob_fails_cleanly() {
        let key = [1u8; 32];
        let err = decrypt(&key, b"short").unwrap_err();
        assert!(matches!(err, Error::AuthFailed));
    }

    #[test]
    fn blob_layout_is_nonce_then_tag_then_ciphertext() {
        let key = [5u8; 32];
        let plaintext = b"abc";
        let blob = encrypt(&key, plaintext).unwrap();
        assert_eq!(blob.len(), NONCE_LEN + TAG_LEN + plaintext.len());
    }
}
