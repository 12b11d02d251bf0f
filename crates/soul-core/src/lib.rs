#![allow(clippy::large_enum_variant)]

pub mod atomic;
pub mod error;
pub mod jsonl;
pub mod paths;

pub use error::{Error, Result};
pub use paths::SoulPath;
