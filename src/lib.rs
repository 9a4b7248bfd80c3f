#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Runners for the command-line tools.
pub mod apps;
/// Pair layout templates and instance assembly.
pub mod assemble;
/// Target-length sampling and segment chunking.
pub mod chunking;
/// Padding collator for assembled instances.
pub mod collator;
/// Instance-building configuration.
pub mod config;
/// Centralized constants used across chunking, pairing, assembly, and corpora.
pub mod constants;
/// Chunk, instance, and batch types.
pub mod data;
mod hash;
/// Aggregate metrics helpers.
pub mod metrics;
/// Pair splitting, relation sampling, and truncation.
pub mod pairing;
/// Batched, parallel map over tokenized lines.
pub mod pipeline;
/// Deterministic random number generation.
pub mod rng;
/// Batch driver producing instances from tokenized lines.
pub mod sampler;
/// Line corpus loading.
pub mod source;
/// Train/validation splitting.
pub mod splits;
/// Tokenizer integration.
pub mod tokenizer;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assemble::{PairTemplate, SpecialTokenTemplate, assemble_instance};
pub use collator::{InstanceCollator, PaddedBatch, PaddingStrategy};
pub use config::{PairConfig, resolve_max_seq_length};
pub use data::{BatchChunkSet, Chunk, InstanceBatch, RelationLabel, TrainingInstance};
pub use errors::PairsError;
pub use hash::derive_batch_seed;
pub use metrics::{LabelBalance, LabelShare, label_balance};
pub use pairing::{PairHalf, SplitPair};
pub use pipeline::{BatchTransform, BatchedMap};
pub use rng::DeterministicRng;
pub use sampler::InstanceSampler;
pub use source::LineCorpus;
pub use splits::{CorpusSplits, SplitLabel, split_by_percentage};
pub use tokenizer::HfTokenizer;
pub use types::{OriginId, Segment, SegmentId, TextLine, TokenId, TypeId};
