//! Size-budget enforcement. `KERN` is never trimmed; everything else is
//! fair game, in a fixed order: `OPEN` tail, then `MEM` oldest entries,
//! then `BONDS` inactive entries, then `DREAMS` older than 30 days.

use chrono::{Duration as ChronoDuration, Utc};

use soul_core::error::Result;

use crate::model::{Block, Seed};

pub const SIZE_BUDGET_BYTES: usize = 5120;

pub fn trim_to_budget(seed: &mut Seed) -> Result<()> {
    if seed.byte_len() <= SIZE_BUDGET_BYTES {
        return Ok(());
    }
    trim_open_tail(seed);
    if seed.byte_len() <= SIZE_BUDGET_BYTES {
        return Ok(());
    }
    trim_mem_oldest(seed);
    if seed.byte_len() <= SIZE_BUDGET_BYTES {
        return Ok(());
    }
    trim_bonds_inactive(seed);
    if seed.byte_len() <= SIZE_BUDGET_BYTES {
        return Ok(());
    }
    trim_dreams_old(seed);
    Ok(())
}

/// Drop entries off the tail of `OPEN` until the seed fits, or the block is
/// empty.
fn trim_open_tail(seed: &mut Seed) {
    let Some(block) = seed.blocks.get_mut("OPEN") else {
        return;
    };
    while seed.byte_len() > SIZE_BUDGET_BYTES {
        let Some(block) = seed.blocks.get_mut("OPEN") else {
            break;
        };
        if block.pairs.pop().is_none() {
            break;
        }
    }
    let _ = block;
}

/// `MEM`'s pairs are in chronological insertion order; drop the oldest
/// (front) entries first.
fn trim_mem_oldest(seed: &mut Seed) {
    loop {
        if seed.byte_len() <= SIZE_BUDGET_BYTES {
            return;
        }
        let Some(block) = seed.blocks.get_mut("MEM") else {
            return;
        };
        if block.pairs.is_empty() {
            if !block.raw.is_empty() {
                // LLM-assisted MEM blocks may be unstructured prose rather
                // than pairs; trim from the front line by line.
                let mut lines: Vec<&str> = block.raw.lines().collect();
                if lines.is_empty() {
                    return;
                }
                lines.remove(0);
                block.raw = lines.join("\n");
                continue;
            }
            return;
        }
        block.pairs.shift_remove_index(0);
    }
}

/// `BONDS` entries whose status reads as inactive are dropped first.
fn trim_bonds_inactive(seed: &mut Seed) {
    let Some(block) = seed.blocks.get_mut("BONDS") else {
        return;
    };
    let inactive_keys: Vec<String> = block
        .pairs
        .iter()
        .filter(|(_, v)| v.to_lowercase().contains("inactive") || v.to_lowercase().contains("dormant"))
        .map(|(k, _)| k.clone())
        .collect();
    for key in inactive_keys {
        if seed.byte_len() <= SIZE_BUDGET_BYTES {
            return;
        }
        if let Some(block) = seed.blocks.get_mut("BONDS") {
            block.pairs.shift_remove(&key);
        }
    }
}

/// `DREAMS` entries keyed by an ISO date older than 30 days are dropped.
fn trim_dreams_old(seed: &mut Seed) {
    let cutoff = Utc::now() - ChronoDuration::days(30);
    let Some(block) = seed.blocks.get_mut("DREAMS") else {
        return;
    };
    let old_keys: Vec<String> = block
        .pairs
        .keys()
        .filter(|k| {
            chrono::DateTime::parse_from_rfc3339(k)
                .map(|d| d.with_timezone(&Utc) < cutoff)
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    for key in old_keys {
        if seed.byte_len() <= SIZE_BUDGET_BYTES {
            return;
        }
        if let Some(block) = seed.blocks.get_mut("DREAMS") {
            block.pairs.shift_remove(&key);
        }
    }
}
