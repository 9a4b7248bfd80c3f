//! Target-length sampling and greedy segment chunking.
//!
//! Each repetition pass draws one target length, then scans the batch's
//! segments in order and closes a chunk as soon as its running token count
//! reaches the target. Empty segments are skipped without closing the
//! running chunk, so blank lines do not act as document boundaries.

use rand::Rng;

use crate::constants::chunking::MIN_TARGET_LENGTH;
use crate::data::{BatchChunkSet, Chunk};
use crate::types::TokenId;

/// Draw the target chunk length for one repetition pass.
///
/// With probability `short_seq_prob` the target is uniform in
/// `[2, max_num_tokens]`; otherwise it is `max_num_tokens`.
pub fn sample_target_length<R: Rng + ?Sized>(
    rng: &mut R,
    max_num_tokens: usize,
    short_seq_prob: f64,
) -> usize {
    if rng.random::<f64>() < short_seq_prob {
        rng.random_range(MIN_TARGET_LENGTH..=max_num_tokens.max(MIN_TARGET_LENGTH))
    } else {
        max_num_tokens
    }
}

/// Group `segments` into chunks whose token count reaches `target_length`.
///
/// The last chunk is flushed when the input is exhausted even if it is short.
/// Chunk order follows input order and no chunk is empty.
pub fn chunk_segments<S: AsRef<[TokenId]>>(
    segments: &[S],
    target_length: usize,
) -> BatchChunkSet<'_> {
    let mut chunks = Vec::new();
    let mut current = Chunk::new();
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() {
            continue;
        }
        current.push(segment);
        if current.token_len() >= target_length {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    fn lens(chunks: &[Chunk<'_>]) -> Vec<Vec<usize>> {
        chunks
            .iter()
            .map(|chunk| chunk.segments().iter().map(|s| s.len()).collect())
            .collect()
    }

    #[test]
    fn target_is_max_when_short_sequences_are_disabled() {
        let mut rng = DeterministicRng::new(1);
        for _ in 0..100 {
            assert_eq!(sample_target_length(&mut rng, 64, 0.0), 64);
        }
    }

    #[test]
    fn short_targets_stay_within_bounds() {
        let mut rng = DeterministicRng::new(2);
        let mut saw_short = false;
        for _ in 0..200 {
            let target = sample_target_length(&mut rng, 16, 1.0);
            assert!((2..=16).contains(&target));
            saw_short |= target < 16;
        }
        assert!(saw_short);
    }

    #[test]
    fn chunks_close_once_target_is_reached() {
        let segments: Vec<Vec<TokenId>> = vec![vec![1, 2], vec![3], vec![4, 5, 6], vec![7], vec![8]];
        let chunks = chunk_segments(&segments, 3);
        assert_eq!(lens(&chunks), vec![vec![2, 1], vec![3], vec![1, 1]]);
        assert!(chunks.iter().all(|chunk| !chunk.is_empty()));
    }

    #[test]
    fn whole_input_forms_one_chunk_under_a_large_target() {
        let segments: Vec<Vec<TokenId>> = vec![vec![1, 2], vec![3], vec![4, 5, 6]];
        let chunks = chunk_segments(&segments, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].token_len(), 6);
    }

    #[test]
    fn empty_segments_do_not_close_the_running_chunk() {
        let segments: Vec<Vec<TokenId>> = vec![vec![1], vec![], vec![2], vec![], vec![3, 4]];
        let chunks = chunk_segments(&segments, 2);
        assert_eq!(lens(&chunks), vec![vec![1, 1], vec![2]]);
    }

    #[test]
    fn trailing_empty_segment_still_flushes_the_residue() {
        let segments: Vec<Vec<TokenId>> = vec![vec![1], vec![2], vec![]];
        let chunks = chunk_segments(&segments, 10);
        assert_eq!(lens(&chunks), vec![vec![1, 1]]);
    }

    #[test]
    fn all_empty_input_yields_no_chunks() {
        let segments: Vec<Vec<TokenId>> = vec![vec![], vec![]];
        assert!(chunk_segments(&segments, 4).is_empty());
    }
}
