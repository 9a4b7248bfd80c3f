//! Batched map: partition segments into batches, transform each, concatenate.
//!
//! Batches are independent. Each transform call receives its batch index so it
//! can derive its own generator, which keeps parallel and sequential runs
//! byte-identical. Output size is not tied to input size: a batch may fan out
//! into any number of instances, including none.

use std::num::NonZeroUsize;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::assemble::PairTemplate;
use crate::config::PairConfig;
use crate::data::InstanceBatch;
use crate::errors::PairsError;
use crate::sampler::InstanceSampler;
use crate::types::Segment;

/// Dataset transform applied to one batch of tokenized lines.
pub trait BatchTransform: Sync {
    /// Transform batch `batch_index` into zero or more instances.
    fn transform(&self, batch_index: usize, segments: &[Segment])
    -> Result<InstanceBatch, PairsError>;
}

impl<T: PairTemplate> BatchTransform for InstanceSampler<T> {
    fn transform(
        &self,
        batch_index: usize,
        segments: &[Segment],
    ) -> Result<InstanceBatch, PairsError> {
        self.build_indexed_batch(batch_index, segments)
    }
}

/// Applies a [`BatchTransform`] over fixed-size batches of segments.
#[derive(Clone, Debug)]
pub struct BatchedMap {
    batch_size: usize,
    num_workers: Option<NonZeroUsize>,
}

impl BatchedMap {
    /// Map over batches of `batch_size` lines using the global rayon pool.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            num_workers: None,
        }
    }

    /// Batch size and worker count taken from `config`.
    pub fn from_config(config: &PairConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            num_workers: config.num_workers,
        }
    }

    /// Run on a dedicated pool of `num_workers` threads.
    pub fn with_workers(mut self, num_workers: NonZeroUsize) -> Self {
        self.num_workers = Some(num_workers);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Transform every batch in parallel and concatenate results in batch order.
    ///
    /// The first failing batch aborts the run; no partial output is returned.
    pub fn run<T: BatchTransform + ?Sized>(
        &self,
        segments: &[Segment],
        transform: &T,
    ) -> Result<InstanceBatch, PairsError> {
        let batches = self.partition(segments)?;
        info!(
            segments = segments.len(),
            batches = batches.len(),
            batch_size = self.batch_size,
            "batched map started"
        );
        let outputs = match self.num_workers {
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers.get())
                    .build()
                    .map_err(|err| {
                        PairsError::Configuration(format!("failed to build worker pool: {err}"))
                    })?;
                pool.install(|| map_parallel(&batches, transform))?
            }
            None => map_parallel(&batches, transform)?,
        };
        Ok(concat(outputs))
    }

    /// Transform every batch on the calling thread.
    pub fn run_sequential<T: BatchTransform + ?Sized>(
        &self,
        segments: &[Segment],
        transform: &T,
    ) -> Result<InstanceBatch, PairsError> {
        let batches = self.partition(segments)?;
        let outputs = batches
            .iter()
            .enumerate()
            .map(|(batch_index, batch)| transform.transform(batch_index, batch))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(concat(outputs))
    }

    fn partition<'a>(&self, segments: &'a [Segment]) -> Result<Vec<&'a [Segment]>, PairsError> {
        if self.batch_size == 0 {
            return Err(PairsError::Configuration(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(segments.chunks(self.batch_size).collect())
    }
}

fn map_parallel<T: BatchTransform + ?Sized>(
    batches: &[&[Segment]],
    transform: &T,
) -> Result<Vec<InstanceBatch>, PairsError> {
    batches
        .par_iter()
        .enumerate()
        .map(|(batch_index, batch)| transform.transform(batch_index, batch))
        .collect()
}

fn concat(outputs: Vec<InstanceBatch>) -> InstanceBatch {
    let mut merged = InstanceBatch::new();
    for mut output in outputs {
        merged.append(&mut output);
    }
    debug!(instances = merged.len(), "batched map finished");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RelationLabel, TrainingInstance};

    /// Emits one instance per batch recording the batch index and size.
    struct EchoTransform;

    impl BatchTransform for EchoTransform {
        fn transform(
            &self,
            batch_index: usize,
            segments: &[Segment],
        ) -> Result<InstanceBatch, PairsError> {
            Ok([TrainingInstance {
                input_ids: vec![batch_index as u32, segments.len() as u32],
                token_type_ids: vec![0, 0],
                attention_mask: vec![1, 1],
                special_tokens_mask: vec![0, 0],
                next_sentence_label: RelationLabel::SameOrder,
                segment_ids: vec![0, 0],
            }]
            .into_iter()
            .collect())
        }
    }

    struct FailingTransform;

    impl BatchTransform for FailingTransform {
        fn transform(
            &self,
            batch_index: usize,
            _segments: &[Segment],
        ) -> Result<InstanceBatch, PairsError> {
            if batch_index == 1 {
                return Err(PairsError::Configuration("boom".into()));
            }
            Ok(InstanceBatch::new())
        }
    }

    fn lines(count: usize) -> Vec<Segment> {
        (0..count as u32).map(|i| vec![i + 1]).collect()
    }

    #[test]
    fn batches_are_concatenated_in_order() {
        let map = BatchedMap::new(4);
        let output = map.run(&lines(10), &EchoTransform).unwrap();
        assert_eq!(
            output.input_ids,
            vec![vec![0, 4], vec![1, 4], vec![2, 2]]
        );
    }

    #[test]
    fn dedicated_pool_matches_sequential() {
        let map = BatchedMap::new(3).with_workers(NonZeroUsize::new(2).unwrap());
        let parallel = map.run(&lines(17), &EchoTransform).unwrap();
        let sequential = map.run_sequential(&lines(17), &EchoTransform).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn failing_batch_aborts_the_run() {
        let map = BatchedMap::new(2);
        assert!(map.run(&lines(6), &FailingTransform).is_err());
        assert!(map.run_sequential(&lines(6), &FailingTransform).is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let map = BatchedMap::new(0);
        assert!(matches!(
            map.run(&lines(3), &EchoTransform),
            Err(PairsError::Configuration(_))
        ));
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let map = BatchedMap::new(8);
        assert!(map.run(&[], &EchoTransform).unwrap().is_empty());
    }
}
