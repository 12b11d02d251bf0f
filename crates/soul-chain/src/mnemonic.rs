//! Mnemonic token validation and generation. A token is 16 words from
//! `WORDLIST`, each word contributing 8 bits, for 128 bits of entropy.

use rand::RngCore;
use soul_core::error::{Error, Result};

use crate::wordlist::WORDLIST;

pub const WORD_COUNT: usize = 16;

/// Validate a space-separated token: exactly 16 words, all present in the
/// wordlist. Returns the 16-byte entropy the words encode.
pub fn validate(token: &str) -> Result<[u8; WORD_COUNT]> {
    let words: Vec<&str> = token.split_whitespace().collect();
    if words.len() != WORD_COUNT {
        return Err(Error::InvalidToken(format!(
            "expected {WORD_COUNT} words, got {}",
            words.len()
        )));
    }
    let mut entropy = [0u8; WORD_COUNT];
    for (i, word) in words.iter().enumerate() {
        let normalized = word.to_lowercase();
        let index = WORDLIST
            .iter()
            .position(|w| *w == normalized)
            .ok_or_else(|| Error::InvalidToken(format!("unknown word: {word}")))?;
        entropy[i] = index as u8;
    }
    Ok(entropy)
}

/// Generate a fresh 16-word token from a CSPRNG.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let mut words = Vec::with_capacity(WORD_COUNT);
    for _ in 0..WORD_COUNT {
        let idx = (rng.next_u32() % WORDLIST.len() as u32) as usize;
        words.push(WORDLIST[idx]);
    }
    words.join(" ")
}

/// Render entropy bytes back to the token form they were parsed from
/// (round-trip helper, mostly useful in tests).
pub fn render(entropy: &[u8; WORD_COUNT]) -> String {
    entropy
        .iter()
        .map(|b| WORDLIST[*b as usize])
        .collect::<Vec<_>>()
        .join(" ")
}
