use std::path::PathBuf;

/// Shared error type for the soul protocol crates.
///
/// Each crate re-exports this as its own `Error`/`Result` so call sites read
/// naturally (`soul_seed::Error`, `soul_chain::Error`, ...) while the
/// underlying taxonomy — and its mapping onto exit codes at the binary
/// boundary — stays in one place.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transient i/o error on {path}: {source}")]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("corrupt seed: {0}")]
    CorruptSeed(String),

    #[error("block template failed for {block}: {reason}")]
    BlockTemplateFailed { block: String, reason: String },

    #[error("seed overflow: {size} bytes after trim, budget is {budget}")]
    SeedOverflow { size: usize, budget: usize },

    #[error("invalid mnemonic token: {0}")]
    InvalidToken(String),

    #[error("decrypt failed")]
    AuthFailed,

    #[error("session guard is active: {reason}")]
    SessionActive { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn transient(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::TransientIo {
            path: path.into(),
            source,
        }
    }

    pub fn block_failed(block: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::BlockTemplateFailed {
            block: block.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error, per the CLI surface contract:
    /// 0 success, 1 configuration error, 2 runtime error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::InvalidToken(_) => 1,
            _ => 2,
        }
    }
}
