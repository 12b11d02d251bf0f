//! Derive the two 32-byte keys from mnemonic entropy via a memory-hard KDF
//! (Argon2id), with distinct salts so `encryption_key` and `topic` are
//! independent even though both come from the same entropy.

use argon2::Argon2;
use soul_core::error::{Error, Result};

pub const KEY_LEN: usize = 32;

const ENC_SALT: &[u8] = b"soul-chain-v1:enc";
const TOPIC_SALT: &[u8] = b"soul-chain-v1:topic";

fn derive(entropy: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let mut out = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(entropy, salt, &mut out)
        .map_err(|e| Error::Other(format!("kdf failed: {e}")))?;
    Ok(out)
}

pub fn encryption_key(entropy: &[u8]) -> Result<[u8; KEY_LEN]> {
    derive(entropy, ENC_SALT)
}

pub fn topic(entropy: &[u8]) -> Result<[u8; KEY_LEN]> {
    derive(entropy, TOPIC_SALT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enc_key_and_topic_differ() {
        let entropy = [7u8; 16];
        let enc = encryption_key(&entropy).unwrap();
        let top = topic(&entropy).unwrap();
        assert_ne!(enc, top);
    }

    #[test]
    fn same_entropy_derives_same_keys() {
        let entropy = [3u8; 16];
        assert_eq!(encryption_key(&entropy).unwrap(), encryption_key(&entropy).unwrap());
        assert_eq!(topic(&entropy).unwrap(), topic(&entropy).unwrap());
    }

    #[test]
    fn different_entropy_derives_different_keys() {
        let a = encryption_key(&[1u8; 16]).unwrap();
        let b = encryption_key(&[2u8; 16]).unwrap();
        assert_ne!(a, b);
    }
}
