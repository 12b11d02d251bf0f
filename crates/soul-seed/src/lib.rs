pub mod consolidate;
pub mod llm_blocks;
pub mod model;
pub mod parse;
pub mod templaters;
pub mod trim;

pub use consolidate::{consolidate, ConsolidateMode, ConsolidationInput};
pub use model::{Block, Seed, KNOWN_BLOCKS};
pub use parse::parse as parse_seed;
pub use trim::SIZE_BUDGET_BYTES;
