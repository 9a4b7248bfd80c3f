/// Constants used by target-length sampling and chunking.
pub mod chunking {
    /// Probability of drawing a short target length for a repetition pass.
    pub const SHORT_SEQ_PROB: f64 = 0.1;
    /// Smallest short target length that can be drawn.
    pub const MIN_TARGET_LENGTH: usize = 2;
}

/// Constants used by relation sampling and truncation.
pub mod pairing {
    /// Draws below this cutoff swap the two halves.
    pub const SWAPPED_CUTOFF: f64 = 1.0 / 3.0;
    /// Draws below this cutoff (and at or above `SWAPPED_CUTOFF`) substitute a random chunk.
    pub const RANDOM_CUTOFF: f64 = 2.0 / 3.0;
    /// Probability of trimming the front (rather than the back) of the longer half.
    pub const FRONT_TRIM_PROB: f64 = 0.5;
    /// Smallest token budget that keeps one token on each side of a pair.
    pub const MIN_MAX_NUM_TOKENS: usize = 2;
}

/// Constants used by instance assembly.
pub mod assemble {
    /// Boundary tokens a pair template must add (start, mid separator, end separator).
    pub const PAIR_BOUNDARY_TOKENS: usize = 3;
    /// Segment id of the leading sentinel.
    pub const LEADING_SENTINEL: u32 = 0;
    /// Token-type id used for the first half and its leading boundary.
    pub const FIRST_TYPE_ID: u32 = 0;
    /// Token-type id used for the second half and its trailing boundary.
    pub const SECOND_TYPE_ID: u32 = 1;
    /// Stand-in token for A when checking a template's pair layout.
    pub const LAYOUT_CHECK_A: u32 = u32::MAX - 1;
    /// Stand-in token for B when checking a template's pair layout.
    pub const LAYOUT_CHECK_B: u32 = u32::MAX;
}

/// Constants used by the batch driver and batched map.
pub mod sampler {
    /// Default maximum assembled sequence length.
    pub const DEFAULT_MAX_SEQ_LENGTH: usize = 512;
    /// Default number of augmented views generated per input batch.
    pub const DEFAULT_DUPE_FACTOR: usize = 5;
    /// Default deterministic seed.
    pub const DEFAULT_SEED: u64 = 42;
    /// Default number of input lines per batch handed to the transform.
    pub const DEFAULT_BATCH_SIZE: usize = 1000;
    /// Offset mixed into per-batch seed derivation.
    pub const BATCH_SEED_OFFSET: u64 = 0x50B5_EED5;
    /// Upper bound applied when the tokenizer reports an oversized model max length.
    pub const MAX_SEQ_LENGTH_CAP: usize = 1024;
}

/// Constants used by corpus loading and splitting.
pub mod corpus {
    /// Preferred JSON field holding the text of a record.
    pub const TEXT_FIELD: &str = "text";
    /// Default share of training lines held out for validation (percent).
    pub const DEFAULT_VALIDATION_SPLIT_PERCENTAGE: u8 = 5;
    /// Output file name for the training split.
    pub const TRAIN_OUTPUT_FILENAME: &str = "train.jsonl";
    /// Output file name for the validation split.
    pub const VALIDATION_OUTPUT_FILENAME: &str = "validation.jsonl";
}

/// Constants used by the tokenizer adapter.
pub mod tokenizer {
    /// Candidate padding-token names, tried in order.
    pub const PAD_TOKEN_NAMES: [&str; 3] = ["[PAD]", "<pad>", "<|pad|>"];
}
