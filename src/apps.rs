use std::error::Error;
use std::fs;
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::{Parser, error::ErrorKind};
use tracing::{info, warn};

use crate::collator::{InstanceCollator, PaddingStrategy};
use crate::config::{PairConfig, resolve_max_seq_length};
use crate::constants::corpus::DEFAULT_VALIDATION_SPLIT_PERCENTAGE;
use crate::data::{InstanceBatch, RelationLabel};
use crate::errors::PairsError;
use crate::metrics::label_balance;
use crate::pipeline::BatchedMap;
use crate::sampler::InstanceSampler;
use crate::source::LineCorpus;
use crate::splits::{SplitLabel, split_by_percentage};
use crate::tokenizer::HfTokenizer;
use crate::types::Segment;

#[derive(Debug, Parser)]
#[command(
    name = "build_instances",
    disable_help_subcommand = true,
    about = "Build sentence-order pretraining instances",
    long_about = "Tokenize a line corpus, group lines into chunks, split each chunk into a labeled pair (same order, swapped, or random), and write one JSON instance per line.",
    after_help = "Without --validation-file, the leading --validation-split-percentage of the training lines is held out for validation."
)]
/// CLI for `build_instances`.
///
/// Explicit flags override values loaded from `--config`.
struct BuildInstancesCli {
    #[arg(long = "train-file", value_name = "PATH", help = "Training corpus file or directory")]
    train_file: PathBuf,
    #[arg(
        long = "validation-file",
        value_name = "PATH",
        help = "Optional validation corpus file or directory"
    )]
    validation_file: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Path to a tokenizer.json file")]
    tokenizer: PathBuf,
    #[arg(long, value_name = "PATH", help = "Optional JSON file holding a PairConfig")]
    config: Option<PathBuf>,
    #[arg(
        long = "max-seq-length",
        value_parser = parse_positive_usize,
        help = "Maximum assembled sequence length (defaults to the model limit, capped at 1024)"
    )]
    max_seq_length: Option<usize>,
    #[arg(
        long = "dupe-factor",
        value_parser = parse_positive_usize,
        help = "Number of independently sampled views per training batch"
    )]
    dupe_factor: Option<usize>,
    #[arg(long, help = "Deterministic base seed")]
    seed: Option<u64>,
    #[arg(
        long = "batch-size",
        value_parser = parse_positive_usize,
        help = "Input lines per batch"
    )]
    batch_size: Option<usize>,
    #[arg(
        long,
        value_parser = parse_positive_usize,
        help = "Worker threads (defaults to the global rayon pool)"
    )]
    workers: Option<usize>,
    #[arg(
        long = "validation-split-percentage",
        default_value_t = DEFAULT_VALIDATION_SPLIT_PERCENTAGE,
        value_parser = clap::value_parser!(u8).range(0..=100),
        help = "Share of training lines held out when no validation file is given"
    )]
    validation_split_percentage: u8,
    #[arg(long = "max-train-samples", help = "Keep at most this many training instances")]
    max_train_samples: Option<usize>,
    #[arg(long = "max-eval-samples", help = "Keep at most this many validation instances")]
    max_eval_samples: Option<usize>,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        help = "Directory receiving train.jsonl and validation.jsonl"
    )]
    output_dir: Option<PathBuf>,
    #[arg(
        long = "pad-to-max-length",
        help = "Pad every instance to max_seq_length before writing"
    )]
    pad_to_max_length: bool,
}

/// Per-split outcome printed at the end of a run.
#[derive(Clone, Debug)]
struct SplitSummary {
    label: SplitLabel,
    lines: usize,
    instances: usize,
    labels: Vec<RelationLabel>,
    fingerprint: u64,
}

/// Run the `build_instances` CLI with arguments excluding the program name.
pub fn run_build_instances<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<BuildInstancesCli, _>(
        std::iter::once("build_instances".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let tokenizer = HfTokenizer::from_file(&cli.tokenizer)?;
    let config = build_config(&cli, tokenizer.model_max_length())?;
    info!(
        max_seq_length = config.max_seq_length,
        dupe_factor = config.dupe_factor,
        seed = config.seed,
        batch_size = config.batch_size,
        vocab_size = tokenizer.vocab_size(),
        "configuration resolved"
    );

    let train_corpus = LineCorpus::load(&cli.train_file)?;
    let (train_lines, validation_lines) = match &cli.validation_file {
        Some(path) => (
            train_corpus.into_lines(),
            LineCorpus::load(path)?.into_lines(),
        ),
        None => {
            let splits =
                split_by_percentage(train_corpus.into_lines(), cli.validation_split_percentage)?;
            (splits.train, splits.validation)
        }
    };

    let collator = if cli.pad_to_max_length {
        let pad_token_id = tokenizer.pad_token_id().ok_or_else(|| {
            PairsError::Tokenizer("--pad-to-max-length requires a tokenizer with a pad token".into())
        })?;
        Some(InstanceCollator::new(
            pad_token_id,
            PaddingStrategy::MaxLength(config.max_seq_length),
        ))
    } else {
        None
    };

    let plans = [
        (
            SplitLabel::Train,
            train_lines,
            config.clone(),
            cli.max_train_samples,
        ),
        (
            SplitLabel::Validation,
            validation_lines,
            config.for_validation(),
            cli.max_eval_samples,
        ),
    ];

    if let Some(dir) = &cli.output_dir {
        fs::create_dir_all(dir)?;
    }

    let mut summaries = Vec::with_capacity(plans.len());
    for (label, lines, split_config, cap) in plans {
        let line_count = lines.len();
        let segments = LineCorpus::from_lines(lines).tokenize(&tokenizer)?;
        let mut batch = build_split(label, &segments, &split_config, &tokenizer, cap)?;
        if let Some(collator) = &collator {
            batch = collator.pad_batch(batch)?;
        }
        summaries.push(SplitSummary {
            label,
            lines: line_count,
            instances: batch.len(),
            labels: batch.next_sentence_label.clone(),
            fingerprint: batch.fingerprint(),
        });
        if let Some(dir) = &cli.output_dir {
            let path = dir.join(label.output_filename());
            write_jsonl(&path, batch)?;
            info!(split = label.name(), path = %path.display(), "split written");
        }
    }

    print_summary(&config, &summaries);
    Ok(())
}

/// Resolve the run configuration: config file, then CLI overrides, then the model limit.
fn build_config(
    cli: &BuildInstancesCli,
    model_max_length: Option<usize>,
) -> Result<PairConfig, PairsError> {
    let mut config = match &cli.config {
        Some(path) => PairConfig::from_json_file(path)?,
        None => PairConfig::default(),
    };
    let requested = cli
        .max_seq_length
        .or_else(|| cli.config.as_ref().map(|_| config.max_seq_length));
    config.max_seq_length = match model_max_length {
        Some(model_max_length) => resolve_max_seq_length(requested, model_max_length),
        None => requested.unwrap_or(config.max_seq_length),
    };
    if let Some(dupe_factor) = cli.dupe_factor {
        config.dupe_factor = dupe_factor;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(workers) = cli.workers {
        config.num_workers = NonZeroUsize::new(workers);
    }
    Ok(config)
}

fn build_split(
    label: SplitLabel,
    segments: &[Segment],
    config: &PairConfig,
    tokenizer: &HfTokenizer,
    cap: Option<usize>,
) -> Result<InstanceBatch, PairsError> {
    if segments.is_empty() {
        warn!(split = label.name(), "split has no lines; nothing to build");
        return Ok(InstanceBatch::new());
    }
    let sampler = InstanceSampler::new(config.clone(), tokenizer)?;
    let mut batch = BatchedMap::from_config(config).run(segments, &sampler)?;
    if let Some(cap) = cap {
        batch.truncate(cap);
    }
    info!(
        split = label.name(),
        lines = segments.len(),
        instances = batch.len(),
        "split built"
    );
    Ok(batch)
}

fn write_jsonl(path: &Path, batch: InstanceBatch) -> Result<(), PairsError> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for instance in batch.into_instances() {
        serde_json::to_writer(&mut writer, &instance)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(config: &PairConfig, summaries: &[SplitSummary]) {
    println!("=== sentence-order instances ===");
    println!("max_seq_length: {}", config.max_seq_length);
    println!("dupe_factor (train): {}", config.dupe_factor);
    println!("seed: {}", config.seed);
    for summary in summaries {
        println!();
        println!("[{}]", summary.label.name().to_uppercase());
        println!("  lines: {}", summary.lines);
        println!("  instances: {}", summary.instances);
        match label_balance(&summary.labels) {
            Some(balance) => {
                for entry in &balance.per_label {
                    println!(
                        "  {}: {} ({:.1}%)",
                        entry.label.name(),
                        entry.count,
                        entry.share * 100.0
                    );
                }
                println!("  max/min ratio: {:.3}", balance.ratio);
            }
            None => println!("  labels: none"),
        }
        println!("  fingerprint: {:016x}", summary.fingerprint);
    }
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> BuildInstancesCli {
        let args = std::iter::once("build_instances").chain(args.iter().copied());
        parse_cli::<BuildInstancesCli, _>(args).unwrap().unwrap()
    }

    #[test]
    fn parse_positive_usize_rejects_zero() {
        assert_eq!(parse_positive_usize("12").unwrap(), 12);
        assert!(parse_positive_usize("0").is_err());
        assert!(parse_positive_usize("x").is_err());
    }

    #[test]
    fn help_is_not_an_error() {
        assert!(run_build_instances(["--help".to_string()].into_iter()).is_ok());
    }

    #[test]
    fn missing_required_flags_are_errors() {
        let parsed = parse_cli::<BuildInstancesCli, _>(["build_instances", "--tokenizer", "t.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn validation_percentage_is_range_checked() {
        let parsed = parse_cli::<BuildInstancesCli, _>([
            "build_instances",
            "--train-file",
            "a.txt",
            "--tokenizer",
            "t.json",
            "--validation-split-percentage",
            "101",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn defaults_follow_the_model_limit() {
        let cli = parse(&["--train-file", "a.txt", "--tokenizer", "t.json"]);
        assert_eq!(cli.validation_split_percentage, 5);
        assert_eq!(build_config(&cli, Some(128)).unwrap().max_seq_length, 128);
        assert_eq!(build_config(&cli, Some(4096)).unwrap().max_seq_length, 1024);
        assert_eq!(build_config(&cli, None).unwrap().max_seq_length, 512);
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"max_seq_length": 64, "dupe_factor": 2, "seed": 9}"#).unwrap();
        let path_arg = path.to_string_lossy().to_string();
        let cli = parse(&[
            "--train-file",
            "a.txt",
            "--tokenizer",
            "t.json",
            "--config",
            &path_arg,
            "--seed",
            "11",
            "--workers",
            "2",
        ]);
        let config = build_config(&cli, Some(512)).unwrap();
        assert_eq!(config.max_seq_length, 64);
        assert_eq!(config.dupe_factor, 2);
        assert_eq!(config.seed, 11);
        assert_eq!(config.num_workers, NonZeroUsize::new(2));

        let clamped = parse(&[
            "--train-file",
            "a.txt",
            "--tokenizer",
            "t.json",
            "--max-seq-length",
            "900",
        ]);
        assert_eq!(build_config(&clamped, Some(512)).unwrap().max_seq_length, 512);
    }
}
