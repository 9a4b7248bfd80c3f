//! Instance assembly: boundary tokens, type ids, masks, and segment ids.

use serde::{Deserialize, Serialize};

use crate::constants::assemble::{
    FIRST_TYPE_ID, LAYOUT_CHECK_A, LAYOUT_CHECK_B, LEADING_SENTINEL, PAIR_BOUNDARY_TOKENS,
    SECOND_TYPE_ID,
};
use crate::data::{RelationLabel, TrainingInstance};
use crate::errors::PairsError;
use crate::pairing::SplitPair;
use crate::types::{OriginId, SegmentId, TokenId, TypeId};

/// Tokenizer capability that turns a token-id pair into one model input.
///
/// Implementations decide which boundary tokens are inserted; instance
/// assembly only requires that a pair gets exactly one start token, one
/// separator between the halves, and one trailing separator.
/// [`check_pair_template`] rejects layouts that do not.
pub trait PairTemplate: Send + Sync {
    /// Number of special tokens added to a single sequence (`pair = false`) or a pair.
    fn special_tokens_overhead(&self, pair: bool) -> usize;
    /// `[START] A [SEP] B [SEP]` (or the implementation's equivalent).
    fn assemble_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TokenId>, PairsError>;
    /// Type ids aligned with [`PairTemplate::assemble_pair`].
    fn token_type_ids_for_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TypeId>, PairsError>;

    /// Ids and type ids together. Override when one pass yields both.
    fn encode_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<(Vec<TokenId>, Vec<TypeId>), PairsError> {
        Ok((
            self.assemble_pair(tokens_a, tokens_b)?,
            self.token_type_ids_for_pair(tokens_a, tokens_b)?,
        ))
    }
}

impl<T: PairTemplate + ?Sized> PairTemplate for &T {
    fn special_tokens_overhead(&self, pair: bool) -> usize {
        (**self).special_tokens_overhead(pair)
    }

    fn assemble_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TokenId>, PairsError> {
        (**self).assemble_pair(tokens_a, tokens_b)
    }

    fn token_type_ids_for_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TypeId>, PairsError> {
        (**self).token_type_ids_for_pair(tokens_a, tokens_b)
    }

    fn encode_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<(Vec<TokenId>, Vec<TypeId>), PairsError> {
        (**self).encode_pair(tokens_a, tokens_b)
    }
}

/// BERT-style template: `start A sep B sep`, type 0 through the first separator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokenTemplate {
    /// Token placed before A (e.g. `[CLS]`).
    pub start_token_id: TokenId,
    /// Token placed after A and after B (e.g. `[SEP]`).
    pub sep_token_id: TokenId,
}

impl SpecialTokenTemplate {
    pub fn new(start_token_id: TokenId, sep_token_id: TokenId) -> Self {
        Self {
            start_token_id,
            sep_token_id,
        }
    }
}

impl PairTemplate for SpecialTokenTemplate {
    fn special_tokens_overhead(&self, pair: bool) -> usize {
        if pair { 3 } else { 2 }
    }

    fn assemble_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TokenId>, PairsError> {
        let mut ids = Vec::with_capacity(tokens_a.len() + tokens_b.len() + PAIR_BOUNDARY_TOKENS);
        ids.push(self.start_token_id);
        ids.extend_from_slice(tokens_a);
        ids.push(self.sep_token_id);
        ids.extend_from_slice(tokens_b);
        ids.push(self.sep_token_id);
        Ok(ids)
    }

    fn token_type_ids_for_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TypeId>, PairsError> {
        let first = tokens_a.len() + 2;
        let second = tokens_b.len() + 1;
        let mut ids = Vec::with_capacity(first + second);
        ids.resize(first, FIRST_TYPE_ID);
        ids.resize(first + second, SECOND_TYPE_ID);
        Ok(ids)
    }
}

/// Reject templates whose pair layout is not `start A sep B sep`.
///
/// The overhead must be exactly three, and a one-token pair must come back
/// with A at position 1 and B at position 3.
pub fn check_pair_template<T: PairTemplate + ?Sized>(template: &T) -> Result<(), PairsError> {
    let overhead = template.special_tokens_overhead(true);
    if overhead != PAIR_BOUNDARY_TOKENS {
        return Err(PairsError::Configuration(format!(
            "pair template adds {overhead} special tokens; exactly {PAIR_BOUNDARY_TOKENS} (start, separator, separator) are required"
        )));
    }
    let (ids, type_ids) = template.encode_pair(&[LAYOUT_CHECK_A], &[LAYOUT_CHECK_B])?;
    let in_place = ids.len() == 2 + PAIR_BOUNDARY_TOKENS
        && type_ids.len() == ids.len()
        && ids[1] == LAYOUT_CHECK_A
        && ids[3] == LAYOUT_CHECK_B;
    if !in_place {
        return Err(PairsError::Configuration(format!(
            "pair template lays out a one-token pair as {ids:?}; expected start, A, separator, B, separator"
        )));
    }
    Ok(())
}

/// `[1, 0 x a_len, 1, 0 x b_len, 1]`.
pub fn special_tokens_mask(a_len: usize, b_len: usize) -> Vec<u8> {
    let mut mask = Vec::with_capacity(a_len + b_len + PAIR_BOUNDARY_TOKENS);
    mask.push(1);
    mask.resize(1 + a_len, 0);
    mask.push(1);
    mask.resize(2 + a_len + b_len, 0);
    mask.push(1);
    mask
}

/// Renumber per-token origin ids into the emitted segment-id sequence.
///
/// A's ids are shifted to start at 1; B's ids start two past A's last id,
/// leaving room for the separator sentinel. The result is
/// `[0] + a' + [a'_last + 1] + b' + [b'_last + 1]`. Both slices must be non-empty.
pub fn renumber_segment_ids(a_origins: &[OriginId], b_origins: &[OriginId]) -> Vec<SegmentId> {
    let mut ids = Vec::with_capacity(a_origins.len() + b_origins.len() + PAIR_BOUNDARY_TOKENS);
    ids.push(LEADING_SENTINEL);

    let a_first = a_origins.first().copied().unwrap_or_default();
    ids.extend(
        a_origins
            .iter()
            .map(|&origin| origin.saturating_sub(a_first) + 1),
    );
    let a_last = ids.last().copied().unwrap_or(LEADING_SENTINEL);
    ids.push(a_last + 1);

    let b_first = b_origins.first().copied().unwrap_or_default();
    ids.extend(
        b_origins
            .iter()
            .map(|&origin| origin.saturating_sub(b_first) + a_last + 2),
    );
    let b_last = ids.last().copied().unwrap_or(LEADING_SENTINEL);
    ids.push(b_last + 1);
    ids
}

/// Build the output record for a truncated pair.
pub fn assemble_instance<T: PairTemplate + ?Sized>(
    template: &T,
    pair: &SplitPair,
    label: RelationLabel,
) -> Result<TrainingInstance, PairsError> {
    let tokens_a = pair.a.tokens();
    let tokens_b = pair.b.tokens();
    let expected = tokens_a.len() + tokens_b.len() + PAIR_BOUNDARY_TOKENS;

    let (input_ids, token_type_ids) = template.encode_pair(tokens_a, tokens_b)?;
    if input_ids.len() != expected || token_type_ids.len() != expected {
        return Err(PairsError::Configuration(format!(
            "pair template produced {} ids and {} type ids for {} content tokens; expected {expected}",
            input_ids.len(),
            token_type_ids.len(),
            tokens_a.len() + tokens_b.len()
        )));
    }

    Ok(TrainingInstance {
        attention_mask: vec![1; input_ids.len()],
        special_tokens_mask: special_tokens_mask(tokens_a.len(), tokens_b.len()),
        segment_ids: renumber_segment_ids(pair.a.origins(), pair.b.origins()),
        input_ids,
        token_type_ids,
        next_sentence_label: label,
    })
}
