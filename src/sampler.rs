use rand::Rng;
use tracing::{debug, trace};

use crate::assemble::{PairTemplate, assemble_instance, check_pair_template};
use crate::chunking::{chunk_segments, sample_target_length};
use crate::config::PairConfig;
use crate::data::InstanceBatch;
use crate::errors::PairsError;
use crate::hash::derive_batch_seed;
use crate::pairing::{assign_relation, split_chunk, truncate_pair};
use crate::rng::DeterministicRng;
use crate::types::TokenId;

/// Builds sentence-order training instances from batches of tokenized lines.
///
/// Every call to [`InstanceSampler::build_batch`] runs `dupe_factor`
/// independent passes over the same segments. Each pass draws its own target
/// length, so chunk boundaries, split points, relations, and truncation all
/// differ between views of the same text.
pub struct InstanceSampler<T: PairTemplate> {
    /// Validated configuration.
    config: PairConfig,
    /// Pair layout provider (boundary tokens and type ids).
    template: T,
    /// Content-token budget shared by both halves.
    max_num_tokens: usize,
}

impl<T: PairTemplate> InstanceSampler<T> {
    /// Validate `config` against `template` and build a sampler.
    pub fn new(config: PairConfig, template: T) -> Result<Self, PairsError> {
        check_pair_template(&template)?;
        let overhead = template.special_tokens_overhead(true);
        config.validate(overhead)?;
        let max_num_tokens = config.max_num_tokens(overhead)?;
        Ok(Self {
            config,
            template,
            max_num_tokens,
        })
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    pub fn template(&self) -> &T {
        &self.template
    }

    /// Content-token budget (`max_seq_length` minus pair overhead).
    pub fn max_num_tokens(&self) -> usize {
        self.max_num_tokens
    }

    /// Build every view of one batch using the generator seeded for `batch_index`.
    pub fn build_indexed_batch<S: AsRef<[TokenId]>>(
        &self,
        batch_index: usize,
        segments: &[S],
    ) -> Result<InstanceBatch, PairsError> {
        let mut rng = DeterministicRng::new(derive_batch_seed(self.config.seed, batch_index));
        self.build_batch(segments, &mut rng)
    }

    /// Run `dupe_factor` passes over `segments`, collecting every surviving instance.
    pub fn build_batch<S: AsRef<[TokenId]>, R: Rng + ?Sized>(
        &self,
        segments: &[S],
        rng: &mut R,
    ) -> Result<InstanceBatch, PairsError> {
        if segments.is_empty() {
            return Err(PairsError::Configuration(
                "input batch contains no segments".into(),
            ));
        }
        let mut out = InstanceBatch::new();
        for pass in 0..self.config.dupe_factor {
            let produced = self.build_pass(segments, rng, &mut out)?;
            trace!(pass, produced, "repetition pass finished");
        }
        debug!(
            segments = segments.len(),
            dupe_factor = self.config.dupe_factor,
            instances = out.len(),
            "batch finished"
        );
        Ok(out)
    }

    fn build_pass<S: AsRef<[TokenId]>, R: Rng + ?Sized>(
        &self,
        segments: &[S],
        rng: &mut R,
        out: &mut InstanceBatch,
    ) -> Result<usize, PairsError> {
        let target_length =
            sample_target_length(rng, self.max_num_tokens, self.config.short_seq_prob);
        if target_length < self.max_num_tokens {
            trace!(target_length, "short target length drawn");
        }
        let chunks = chunk_segments(segments, target_length);
        let mut produced = 0usize;
        for (chunk_idx, chunk) in chunks.iter().enumerate() {
            let Some(mut pair) = split_chunk(rng, chunk) else {
                trace!(chunk_idx, segments = chunk.len(), "chunk skipped: empty half");
                continue;
            };
            let label = assign_relation(rng, &mut pair, chunk_idx, &chunks);
            if pair.a.is_empty() || pair.b.is_empty() {
                trace!(chunk_idx, "chunk skipped: empty half after relation");
                continue;
            }
            truncate_pair(rng, &mut pair, self.max_num_tokens)?;
            out.push(assemble_instance(&self.template, &pair, label)?);
            produced += 1;
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::SpecialTokenTemplate;
    use crate::data::RelationLabel;

    const CLS: TokenId = 101;
    const SEP: TokenId = 102;

    fn sampler(config: PairConfig) -> InstanceSampler<SpecialTokenTemplate> {
        InstanceSampler::new(config, SpecialTokenTemplate::new(CLS, SEP)).unwrap()
    }

    fn corpus(lines: usize, tokens_per_line: u32) -> Vec<Vec<TokenId>> {
        (0..lines as u32)
            .map(|line| (0..tokens_per_line).map(|t| 1_000 + line * 100 + t).collect())
            .collect()
    }

    #[test]
    fn budget_excludes_pair_overhead() {
        let sampler = sampler(PairConfig {
            max_seq_length: 16,
            ..PairConfig::default()
        });
        assert_eq!(sampler.max_num_tokens(), 13);
    }

    #[test]
    fn invalid_configs_are_rejected_up_front() {
        let result = InstanceSampler::new(
            PairConfig {
                max_seq_length: 4,
                ..PairConfig::default()
            },
            SpecialTokenTemplate::new(CLS, SEP),
        );
        assert!(matches!(
            result,
            Err(PairsError::TruncationUnderflow { .. })
        ));
    }

    #[test]
    fn empty_batches_are_configuration_errors() {
        let sampler = sampler(PairConfig::default());
        let segments: Vec<Vec<TokenId>> = Vec::new();
        let mut rng = DeterministicRng::new(0);
        assert!(matches!(
            sampler.build_batch(&segments, &mut rng),
            Err(PairsError::Configuration(_))
        ));
    }

    #[test]
    fn blank_only_batches_produce_nothing() {
        let sampler = sampler(PairConfig::default());
        let segments: Vec<Vec<TokenId>> = vec![vec![], vec![]];
        let mut rng = DeterministicRng::new(0);
        assert!(sampler.build_batch(&segments, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn instances_respect_max_seq_length() {
        let sampler = sampler(PairConfig {
            max_seq_length: 24,
            dupe_factor: 4,
            ..PairConfig::default()
        });
        let segments = corpus(40, 7);
        let mut rng = DeterministicRng::new(3);
        let batch = sampler.build_batch(&segments, &mut rng).unwrap();
        assert!(!batch.is_empty());
        for idx in 0..batch.len() {
            let instance = batch.get(idx).unwrap();
            assert!(instance.len() <= 24);
            assert_eq!(instance.token_type_ids.len(), instance.len());
            assert_eq!(instance.segment_ids.len(), instance.len());
            assert_eq!(instance.special_tokens_mask.len(), instance.len());
            assert_eq!(instance.input_ids[0], CLS);
            assert_eq!(*instance.input_ids.last().unwrap(), SEP);
        }
    }

    #[test]
    fn dupe_factor_multiplies_views() {
        let segments = corpus(20, 5);
        let single = sampler(PairConfig {
            max_seq_length: 1_000,
            dupe_factor: 1,
            short_seq_prob: 0.0,
            ..PairConfig::default()
        });
        let triple = sampler(PairConfig {
            max_seq_length: 1_000,
            dupe_factor: 3,
            short_seq_prob: 0.0,
            ..PairConfig::default()
        });
        let mut rng = DeterministicRng::new(1);
        assert_eq!(single.build_batch(&segments, &mut rng).unwrap().len(), 1);
        let mut rng = DeterministicRng::new(1);
        assert_eq!(triple.build_batch(&segments, &mut rng).unwrap().len(), 3);
    }

    #[test]
    fn single_chunk_batches_never_get_random_labels() {
        let sampler = sampler(PairConfig {
            max_seq_length: 1_000,
            dupe_factor: 300,
            short_seq_prob: 0.0,
            ..PairConfig::default()
        });
        let segments = corpus(6, 3);
        let mut rng = DeterministicRng::new(21);
        let batch = sampler.build_batch(&segments, &mut rng).unwrap();
        assert_eq!(batch.len(), 300);
        assert!(
            !batch
                .next_sentence_label
                .contains(&RelationLabel::Random)
        );
        assert!(
            batch
                .next_sentence_label
                .contains(&RelationLabel::Swapped)
        );
        assert!(
            batch
                .next_sentence_label
                .contains(&RelationLabel::SameOrder)
        );
    }

    #[test]
    fn indexed_batches_are_reproducible() {
        let sampler = sampler(PairConfig {
            max_seq_length: 32,
            ..PairConfig::default()
        });
        let segments = corpus(30, 4);
        let first = sampler.build_indexed_batch(2, &segments).unwrap();
        let second = sampler.build_indexed_batch(2, &segments).unwrap();
        let other = sampler.build_indexed_batch(3, &segments).unwrap();
        assert_eq!(first, second);
        assert_ne!(first.fingerprint(), other.fingerprint());
    }
}
