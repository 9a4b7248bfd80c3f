//! Pair splitting, relation sampling, and joint truncation.
//!
//! A half owns a fixed arena of tokens and origin ids and exposes a live
//! `[start, end)` window over it. Truncation only moves the window bounds, so
//! trimming from either end is constant time and tokens stay aligned with
//! their origin ids.

use std::mem;

use rand::Rng;

use crate::constants::pairing::{FRONT_TRIM_PROB, RANDOM_CUTOFF, SWAPPED_CUTOFF};
use crate::data::{Chunk, RelationLabel};
use crate::errors::PairsError;
use crate::types::{OriginId, TokenId};

/// One half of a pair: tokens plus the chunk position each token came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairHalf {
    tokens: Vec<TokenId>,
    origins: Vec<OriginId>,
    start: usize,
    end: usize,
}

impl PairHalf {
    /// Flatten `segments`, tagging tokens of the `j`-th segment with origin `first_origin + j`.
    pub fn from_segments(segments: &[&[TokenId]], first_origin: usize) -> Self {
        let total: usize = segments.iter().map(|segment| segment.len()).sum();
        let mut tokens = Vec::with_capacity(total);
        let mut origins = Vec::with_capacity(total);
        for (offset, segment) in segments.iter().enumerate() {
            tokens.extend_from_slice(segment);
            origins.extend(std::iter::repeat_n(
                (first_origin + offset) as OriginId,
                segment.len(),
            ));
        }
        Self {
            tokens,
            origins,
            start: 0,
            end: total,
        }
    }

    /// Live tokens.
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens[self.start..self.end]
    }

    /// Live origin ids, aligned with [`PairHalf::tokens`].
    pub fn origins(&self) -> &[OriginId] {
        &self.origins[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn trim_front(&mut self) {
        if self.start < self.end {
            self.start += 1;
        }
    }

    fn trim_back(&mut self) {
        if self.start < self.end {
            self.end -= 1;
        }
    }
}

/// A chunk divided into halves A and B.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPair {
    pub a: PairHalf,
    pub b: PairHalf,
}

impl SplitPair {
    /// Combined live length of both halves.
    pub fn total_len(&self) -> usize {
        self.a.len() + self.b.len()
    }

    /// Exchange A and B together with their origin ids.
    pub fn swap(&mut self) {
        mem::swap(&mut self.a, &mut self.b);
    }
}

/// Draw how many segments go into A: fixed at 1 for single-segment chunks,
/// otherwise uniform in `[1, chunk_len - 1]`.
pub fn split_point<R: Rng + ?Sized>(rng: &mut R, chunk_len: usize) -> usize {
    if chunk_len >= 2 {
        rng.random_range(1..chunk_len)
    } else {
        1
    }
}

/// Split `chunk` so segments `[0, a_end)` form A and the rest form B.
///
/// Returns `None` when either half ends up without tokens.
pub fn split_chunk_at(chunk: &Chunk<'_>, a_end: usize) -> Option<SplitPair> {
    let a_end = a_end.min(chunk.len());
    let (head, tail) = chunk.segments().split_at(a_end);
    let a = PairHalf::from_segments(head, 0);
    let b = PairHalf::from_segments(tail, a_end);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(SplitPair { a, b })
}

/// Split `chunk` at a randomly drawn point.
pub fn split_chunk<R: Rng + ?Sized>(rng: &mut R, chunk: &Chunk<'_>) -> Option<SplitPair> {
    let a_end = split_point(rng, chunk.len());
    split_chunk_at(chunk, a_end)
}

/// Map a uniform draw to a relation label.
///
/// `Random` needs at least one other chunk in the batch; otherwise the middle
/// third falls back to `SameOrder`.
pub fn relation_for_draw(draw: f64, chunk_count: usize) -> RelationLabel {
    if draw < SWAPPED_CUTOFF {
        RelationLabel::Swapped
    } else if draw < RANDOM_CUTOFF && chunk_count > 1 {
        RelationLabel::Random
    } else {
        RelationLabel::SameOrder
    }
}

/// Label `pair` from an explicit `draw`, rewriting it to match the label.
///
/// `rng` is only consulted to pick the substitute chunk for `Random`.
pub fn assign_relation_with_draw<R: Rng + ?Sized>(
    rng: &mut R,
    draw: f64,
    pair: &mut SplitPair,
    chunk_idx: usize,
    chunks: &[Chunk<'_>],
) -> RelationLabel {
    let label = relation_for_draw(draw, chunks.len());
    match label {
        RelationLabel::Swapped => pair.swap(),
        RelationLabel::Random => {
            let other = other_chunk_index(rng, chunk_idx, chunks.len());
            pair.b = PairHalf::from_segments(chunks[other].segments(), 0);
        }
        RelationLabel::SameOrder => {}
    }
    label
}

/// Draw a relation for `pair` (chunk `chunk_idx` of `chunks`) and apply it.
pub fn assign_relation<R: Rng + ?Sized>(
    rng: &mut R,
    pair: &mut SplitPair,
    chunk_idx: usize,
    chunks: &[Chunk<'_>],
) -> RelationLabel {
    let draw = rng.random::<f64>();
    assign_relation_with_draw(rng, draw, pair, chunk_idx, chunks)
}

/// Uniform index in `0..count` excluding `current`. Requires `count >= 2`.
fn other_chunk_index<R: Rng + ?Sized>(rng: &mut R, current: usize, count: usize) -> usize {
    let idx = rng.random_range(0..count - 1);
    if idx >= current { idx + 1 } else { idx }
}

/// Trim the longer half (A on ties) from a random end until the pair fits
/// `max_num_tokens`.
///
/// Fails instead of emptying a half when the budget cannot hold one token per side.
pub fn truncate_pair<R: Rng + ?Sized>(
    rng: &mut R,
    pair: &mut SplitPair,
    max_num_tokens: usize,
) -> Result<(), PairsError> {
    while pair.total_len() > max_num_tokens {
        let target = if pair.a.len() >= pair.b.len() {
            &mut pair.a
        } else {
            &mut pair.b
        };
        if target.len() <= 1 {
            return Err(PairsError::TruncationUnderflow { max_num_tokens });
        }
        if rng.random::<f64>() < FRONT_TRIM_PROB {
            target.trim_front();
        } else {
            target.trim_back();
        }
    }
    Ok(())
}
