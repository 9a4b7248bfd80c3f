use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::chunking::SHORT_SEQ_PROB;
use crate::constants::pairing::MIN_MAX_NUM_TOKENS;
use crate::constants::sampler::{
    DEFAULT_BATCH_SIZE, DEFAULT_DUPE_FACTOR, DEFAULT_MAX_SEQ_LENGTH, DEFAULT_SEED,
    MAX_SEQ_LENGTH_CAP,
};
use crate::errors::PairsError;

/// Top-level instance-building configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    /// Maximum assembled sequence length, special tokens included.
    pub max_seq_length: usize,
    /// Number of independently sampled views generated per input batch.
    pub dupe_factor: usize,
    /// Probability of drawing a short target length for a repetition pass.
    pub short_seq_prob: f64,
    /// Base seed; each batch derives its own generator from it.
    pub seed: u64,
    /// Number of input lines per batch handed to the transform.
    ///
    /// Chunks never span batches, and the "random" relation only draws
    /// substitutes from chunks of the same batch.
    pub batch_size: usize,
    /// Worker threads for the batched map (`None` uses the global rayon pool).
    pub num_workers: Option<NonZeroUsize>,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
            dupe_factor: DEFAULT_DUPE_FACTOR,
            short_seq_prob: SHORT_SEQ_PROB,
            seed: DEFAULT_SEED,
            batch_size: DEFAULT_BATCH_SIZE,
            num_workers: None,
        }
    }
}

impl PairConfig {
    /// Load a configuration from a JSON file; missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PairsError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Copy of this configuration used for validation data (one view per batch).
    pub fn for_validation(&self) -> Self {
        Self {
            dupe_factor: 1,
            ..self.clone()
        }
    }

    /// Token budget shared by both halves once `overhead` special tokens are reserved.
    pub fn max_num_tokens(&self, overhead: usize) -> Result<usize, PairsError> {
        let budget = self.max_seq_length.checked_sub(overhead).ok_or_else(|| {
            PairsError::Configuration(format!(
                "max_seq_length={} is smaller than the {} special tokens added to a pair",
                self.max_seq_length, overhead
            ))
        })?;
        if budget < MIN_MAX_NUM_TOKENS {
            return Err(PairsError::TruncationUnderflow {
                max_num_tokens: budget,
            });
        }
        Ok(budget)
    }

    /// Check every setting against a pair template adding `overhead` special tokens.
    pub fn validate(&self, overhead: usize) -> Result<(), PairsError> {
        if self.dupe_factor == 0 {
            return Err(PairsError::Configuration(
                "dupe_factor must be at least 1".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(PairsError::Configuration(
                "batch_size must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.short_seq_prob) {
            return Err(PairsError::Configuration(format!(
                "short_seq_prob must lie in [0, 1], got {}",
                self.short_seq_prob
            )));
        }
        self.max_num_tokens(overhead)?;
        Ok(())
    }
}

/// Pick the effective `max_seq_length` given the tokenizer's model limit.
///
/// Without a request the model limit is used, capped at 1024. A request above
/// the model limit is clamped to it.
pub fn resolve_max_seq_length(requested: Option<usize>, model_max_length: usize) -> usize {
    match requested {
        None if model_max_length > MAX_SEQ_LENGTH_CAP => {
            warn!(
                model_max_length,
                "tokenizer reports a very large model_max_length; using {MAX_SEQ_LENGTH_CAP} instead"
            );
            MAX_SEQ_LENGTH_CAP
        }
        None => model_max_length,
        Some(requested) if requested > model_max_length => {
            warn!(
                requested,
                model_max_length, "max_seq_length exceeds the model limit; clamping"
            );
            model_max_length
        }
        Some(requested) => requested,
    }
}
