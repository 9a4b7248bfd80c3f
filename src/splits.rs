use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::corpus::{TRAIN_OUTPUT_FILENAME, VALIDATION_OUTPUT_FILENAME};
use crate::errors::PairsError;

/// Logical dataset partitions produced by the builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitLabel {
    /// Training split.
    Train,
    /// Validation split.
    Validation,
}

impl SplitLabel {
    /// Both splits in output order.
    pub const ALL: [SplitLabel; 2] = [SplitLabel::Train, SplitLabel::Validation];

    /// Lowercase name used in logs and summaries.
    pub fn name(self) -> &'static str {
        match self {
            SplitLabel::Train => "train",
            SplitLabel::Validation => "validation",
        }
    }

    /// JSONL file the split is written to.
    pub fn output_filename(self) -> &'static str {
        match self {
            SplitLabel::Train => TRAIN_OUTPUT_FILENAME,
            SplitLabel::Validation => VALIDATION_OUTPUT_FILENAME,
        }
    }
}

/// Items partitioned into train and validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusSplits<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
}

impl<T> CorpusSplits<T> {
    /// Items of one split.
    pub fn get(&self, label: SplitLabel) -> &[T] {
        match label {
            SplitLabel::Train => &self.train,
            SplitLabel::Validation => &self.validation,
        }
    }
}

/// Hold out the first `percentage`% of `items` for validation, keeping order.
///
/// The held-out count is rounded to the nearest item. Splitting is positional,
/// so neighbouring lines stay in the same split.
pub fn split_by_percentage<T>(
    mut items: Vec<T>,
    percentage: u8,
) -> Result<CorpusSplits<T>, PairsError> {
    if percentage > 100 {
        return Err(PairsError::Configuration(format!(
            "validation split percentage must be at most 100, got {percentage}"
        )));
    }
    let held_out = (items.len() * percentage as usize + 50) / 100;
    let train = items.split_off(held_out);
    debug!(
        percentage,
        train = train.len(),
        validation = items.len(),
        "corpus split by percentage"
    );
    Ok(CorpusSplits {
        train,
        validation: items,
    })
}
