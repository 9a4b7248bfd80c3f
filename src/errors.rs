use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration, truncation, tokenizer, and corpus failures.
#[derive(Debug, Error)]
pub enum PairsError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(
        "max_num_tokens={max_num_tokens} cannot keep at least one token on each side of a pair"
    )]
    TruncationUnderflow { max_num_tokens: usize },
    #[error("tokenizer failure: {0}")]
    Tokenizer(String),
    #[error("corpus '{}' is unreadable: {reason}", path.display())]
    Corpus { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
