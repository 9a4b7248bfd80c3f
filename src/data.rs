use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::hash::stable_hash_with;
pub use crate::types::{OriginId, Segment, SegmentId, TokenId, TypeId};

/// How the second half of a pair relates to the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RelationLabel {
    /// B is the genuine continuation of A.
    SameOrder = 0,
    /// The true order is reversed: the emitted B originally preceded A.
    Swapped = 1,
    /// B was replaced by an unrelated chunk from the same batch.
    Random = 2,
}

impl RelationLabel {
    /// Every label in class-id order.
    pub const ALL: [RelationLabel; 3] = [
        RelationLabel::SameOrder,
        RelationLabel::Swapped,
        RelationLabel::Random,
    ];

    /// Class id emitted as `next_sentence_label`.
    pub fn class_id(self) -> u8 {
        self as u8
    }

    /// Lowercase name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            RelationLabel::SameOrder => "same_order",
            RelationLabel::Swapped => "swapped",
            RelationLabel::Random => "random",
        }
    }
}

impl From<RelationLabel> for u8 {
    fn from(label: RelationLabel) -> Self {
        label.class_id()
    }
}

impl TryFrom<u8> for RelationLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RelationLabel::SameOrder),
            1 => Ok(RelationLabel::Swapped),
            2 => Ok(RelationLabel::Random),
            other => Err(format!("unknown relation label {other}")),
        }
    }
}

/// A run of non-empty segments grouped toward a target token length.
///
/// Segments are borrowed from the input batch; a chunk is never empty once flushed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk<'a> {
    segments: Vec<&'a [TokenId]>,
    token_len: usize,
}

impl<'a> Chunk<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: &'a [TokenId]) {
        self.token_len += segment.len();
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[&'a [TokenId]] {
        &self.segments
    }

    /// Number of segments in the chunk.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total number of tokens across all segments.
    pub fn token_len(&self) -> usize {
        self.token_len
    }
}

/// Ordered chunks derived from one input batch; the pool for random substitutes.
pub type BatchChunkSet<'a> = Vec<Chunk<'a>>;

/// Final output record for one surviving pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingInstance {
    /// Token ids with boundary tokens inserted by the pair template.
    pub input_ids: Vec<TokenId>,
    /// Token-type ids from the pair template.
    pub token_type_ids: Vec<TypeId>,
    /// All ones; padding is deferred to a collator.
    pub attention_mask: Vec<u8>,
    /// Ones at the three boundary positions, zeros over content.
    pub special_tokens_mask: Vec<u8>,
    /// Relation between the two halves.
    pub next_sentence_label: RelationLabel,
    /// Per-token line membership with sentinels around each half.
    pub segment_ids: Vec<SegmentId>,
}

impl TrainingInstance {
    /// Assembled sequence length.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Output batch holding parallel per-instance lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceBatch {
    pub input_ids: Vec<Vec<TokenId>>,
    pub token_type_ids: Vec<Vec<TypeId>>,
    pub attention_mask: Vec<Vec<u8>>,
    pub special_tokens_mask: Vec<Vec<u8>>,
    pub next_sentence_label: Vec<RelationLabel>,
    pub segment_ids: Vec<Vec<SegmentId>>,
}

impl InstanceBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    pub fn push(&mut self, instance: TrainingInstance) {
        let TrainingInstance {
            input_ids,
            token_type_ids,
            attention_mask,
            special_tokens_mask,
            next_sentence_label,
            segment_ids,
        } = instance;
        self.input_ids.push(input_ids);
        self.token_type_ids.push(token_type_ids);
        self.attention_mask.push(attention_mask);
        self.special_tokens_mask.push(special_tokens_mask);
        self.next_sentence_label.push(next_sentence_label);
        self.segment_ids.push(segment_ids);
    }

    /// Move every instance of `other` to the end of this batch, preserving order.
    pub fn append(&mut self, other: &mut InstanceBatch) {
        self.input_ids.append(&mut other.input_ids);
        self.token_type_ids.append(&mut other.token_type_ids);
        self.attention_mask.append(&mut other.attention_mask);
        self.special_tokens_mask
            .append(&mut other.special_tokens_mask);
        self.next_sentence_label
            .append(&mut other.next_sentence_label);
        self.segment_ids.append(&mut other.segment_ids);
    }

    /// Keep only the first `len` instances.
    pub fn truncate(&mut self, len: usize) {
        self.input_ids.truncate(len);
        self.token_type_ids.truncate(len);
        self.attention_mask.truncate(len);
        self.special_tokens_mask.truncate(len);
        self.next_sentence_label.truncate(len);
        self.segment_ids.truncate(len);
    }

    /// Copy out the instance at `idx`.
    pub fn get(&self, idx: usize) -> Option<TrainingInstance> {
        Some(TrainingInstance {
            input_ids: self.input_ids.get(idx)?.clone(),
            token_type_ids: self.token_type_ids.get(idx)?.clone(),
            attention_mask: self.attention_mask.get(idx)?.clone(),
            special_tokens_mask: self.special_tokens_mask.get(idx)?.clone(),
            next_sentence_label: *self.next_sentence_label.get(idx)?,
            segment_ids: self.segment_ids.get(idx)?.clone(),
        })
    }

    /// Split the parallel lists back into per-instance records.
    pub fn into_instances(self) -> Vec<TrainingInstance> {
        let InstanceBatch {
            input_ids,
            token_type_ids,
            attention_mask,
            special_tokens_mask,
            next_sentence_label,
            segment_ids,
        } = self;
        input_ids
            .into_iter()
            .zip(token_type_ids)
            .zip(attention_mask)
            .zip(special_tokens_mask)
            .zip(next_sentence_label)
            .zip(segment_ids)
            .map(
                |(
                    ((((input_ids, token_type_ids), attention_mask), special_tokens_mask), label),
                    segment_ids,
                )| TrainingInstance {
                    input_ids,
                    token_type_ids,
                    attention_mask,
                    special_tokens_mask,
                    next_sentence_label: label,
                    segment_ids,
                },
            )
            .collect()
    }

    /// 64-bit hash over every output list, used to compare runs built by the same binary.
    pub fn fingerprint(&self) -> u64 {
        stable_hash_with(|hasher| {
            self.input_ids.hash(hasher);
            self.token_type_ids.hash(hasher);
            self.attention_mask.hash(hasher);
            self.special_tokens_mask.hash(hasher);
            self.next_sentence_label.hash(hasher);
            self.segment_ids.hash(hasher);
        })
    }
}

impl FromIterator<TrainingInstance> for InstanceBatch {
    fn from_iter<I: IntoIterator<Item = TrainingInstance>>(iter: I) -> Self {
        let mut batch = InstanceBatch::new();
        for instance in iter {
            batch.push(instance);
        }
        batch
    }
}
