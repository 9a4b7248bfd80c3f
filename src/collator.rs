//! Padding of assembled instances.
//!
//! Instance building never pads. Padding is an explicit collator object so
//! callers choose the strategy per use (dynamic batches for training, fixed
//! length for export) without altering tokenizer behavior.

use serde::{Deserialize, Serialize};

use crate::data::{InstanceBatch, RelationLabel, TrainingInstance};
use crate::errors::PairsError;
use crate::types::{SegmentId, TokenId, TypeId};

/// Target length policy for a padded batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddingStrategy {
    /// Pad to the longest instance in the batch.
    Longest,
    /// Pad every instance to exactly this length.
    MaxLength(usize),
}

/// Rectangular batch ready for a model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddedBatch {
    /// Input token ids `[batch_size, seq_len]`.
    pub input_ids: Vec<Vec<TokenId>>,
    /// Token-type ids `[batch_size, seq_len]`.
    pub token_type_ids: Vec<Vec<TypeId>>,
    /// Attention mask `[batch_size, seq_len]`, zero over padding.
    pub attention_mask: Vec<Vec<u8>>,
    /// Special-token mask `[batch_size, seq_len]`, one over padding.
    pub special_tokens_mask: Vec<Vec<u8>>,
    /// Segment ids `[batch_size, seq_len]`; padding continues past the last sentinel.
    pub segment_ids: Vec<Vec<SegmentId>>,
    /// Relation label per instance.
    pub next_sentence_label: Vec<RelationLabel>,
    /// Padded sequence length.
    pub seq_len: usize,
}

/// Pads instances according to a [`PaddingStrategy`].
#[derive(Clone, Debug)]
pub struct InstanceCollator {
    /// Padding token id.
    pub pad_token_id: TokenId,
    /// Length policy.
    pub strategy: PaddingStrategy,
    /// Round the target length up to a multiple of this value.
    pub pad_to_multiple_of: Option<usize>,
}

impl InstanceCollator {
    pub fn new(pad_token_id: TokenId, strategy: PaddingStrategy) -> Self {
        Self {
            pad_token_id,
            strategy,
            pad_to_multiple_of: None,
        }
    }

    pub fn with_pad_to_multiple_of(mut self, multiple: usize) -> Self {
        self.pad_to_multiple_of = Some(multiple).filter(|value| *value > 0);
        self
    }

    /// Length every instance is padded to, given the longest instance.
    pub fn target_len(&self, longest: usize) -> usize {
        let base = match self.strategy {
            PaddingStrategy::Longest => longest,
            PaddingStrategy::MaxLength(len) => len,
        };
        match self.pad_to_multiple_of {
            Some(multiple) => base.div_ceil(multiple) * multiple,
            None => base,
        }
    }

    /// Pad one instance to `target`. Instances longer than `target` are rejected.
    pub fn pad_instance(
        &self,
        instance: &TrainingInstance,
        target: usize,
    ) -> Result<TrainingInstance, PairsError> {
        let len = instance.len();
        if len > target {
            return Err(PairsError::Configuration(format!(
                "instance of length {len} exceeds padding target {target}"
            )));
        }
        let segment_pad = instance
            .segment_ids
            .last()
            .map(|last| last + 1)
            .unwrap_or_default();
        let mut padded = instance.clone();
        padded.input_ids.resize(target, self.pad_token_id);
        padded.token_type_ids.resize(target, 0);
        padded.attention_mask.resize(target, 0);
        padded.special_tokens_mask.resize(target, 1);
        padded.segment_ids.resize(target, segment_pad);
        Ok(padded)
    }

    /// Pad every instance of `batch`, keeping the parallel-list layout.
    pub fn pad_batch(&self, batch: InstanceBatch) -> Result<InstanceBatch, PairsError> {
        let instances = batch.into_instances();
        let longest = instances.iter().map(TrainingInstance::len).max().unwrap_or(0);
        let target = self.target_len(longest);
        instances
            .iter()
            .map(|instance| self.pad_instance(instance, target))
            .collect()
    }

    /// Collate instances into a rectangular batch.
    pub fn collate(&self, instances: &[TrainingInstance]) -> Result<PaddedBatch, PairsError> {
        let longest = instances.iter().map(TrainingInstance::len).max().unwrap_or(0);
        let seq_len = self.target_len(longest);
        let mut batch = PaddedBatch {
            input_ids: Vec::with_capacity(instances.len()),
            token_type_ids: Vec::with_capacity(instances.len()),
            attention_mask: Vec::with_capacity(instances.len()),
            special_tokens_mask: Vec::with_capacity(instances.len()),
            segment_ids: Vec::with_capacity(instances.len()),
            next_sentence_label: Vec::with_capacity(instances.len()),
            seq_len,
        };
        for instance in instances {
            let padded = self.pad_instance(instance, seq_len)?;
            batch.input_ids.push(padded.input_ids);
            batch.token_type_ids.push(padded.token_type_ids);
            batch.attention_mask.push(padded.attention_mask);
            batch.special_tokens_mask.push(padded.special_tokens_mask);
            batch.segment_ids.push(padded.segment_ids);
            batch.next_sentence_label.push(padded.next_sentence_label);
        }
        Ok(batch)
    }
}
