use std::fs;
use std::path::Path;

use tempfile::tempdir;

use sop_pairs::apps::run_build_instances;
use sop_pairs::{
    BatchedMap, HfTokenizer, InstanceCollator, InstanceSampler, LineCorpus, PaddingStrategy,
    PairConfig, PairTemplate, RelationLabel, SplitLabel, TrainingInstance, split_by_percentage,
};

const TOKENIZER_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [],
    "normalizer": null,
    "pre_tokenizer": { "type": "Whitespace" },
    "post_processor": { "type": "BertProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1] },
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "[UNK]": 0, "[CLS]": 1, "[SEP]": 2, "[PAD]": 3,
            "the": 4, "cat": 5, "sat": 6, "on": 7, "mat": 8,
            "dogs": 9, "bark": 10, "loudly": 11, "birds": 12, "sing": 13
        },
        "unk_token": "[UNK]"
    }
}"#;

const SENTENCES: [&str; 5] = [
    "the cat sat on the mat",
    "dogs bark loudly",
    "birds sing",
    "the dogs sat",
    "birds bark on the mat loudly",
];

fn write_fixture(dir: &Path, lines: usize) -> (String, String) {
    let tokenizer_path = dir.join("tokenizer.json");
    fs::write(&tokenizer_path, TOKENIZER_JSON).unwrap();
    let corpus_path = dir.join("corpus.txt");
    let text: Vec<&str> = (0..lines)
        .map(|idx| if idx % 7 == 6 { "" } else { SENTENCES[idx % SENTENCES.len()] })
        .collect();
    fs::write(&corpus_path, text.join("\n")).unwrap();
    (
        tokenizer_path.to_string_lossy().to_string(),
        corpus_path.to_string_lossy().to_string(),
    )
}

fn read_instances(path: &Path) -> Vec<TrainingInstance> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn run(args: &[&str]) {
    run_build_instances(args.iter().map(|arg| arg.to_string())).unwrap();
}

#[test]
fn library_pipeline_builds_bounded_instances() {
    let dir = tempdir().unwrap();
    let (tokenizer_path, corpus_path) = write_fixture(dir.path(), 60);
    let tokenizer = HfTokenizer::from_file(&tokenizer_path).unwrap();
    let corpus = LineCorpus::load(&corpus_path).unwrap();
    assert_eq!(corpus.len(), 60);

    let splits = split_by_percentage(corpus.into_lines(), 10).unwrap();
    assert_eq!(splits.get(SplitLabel::Validation).len(), 6);
    let segments = LineCorpus::from_lines(splits.train).tokenize(&tokenizer).unwrap();

    let config = PairConfig {
        max_seq_length: 20,
        dupe_factor: 2,
        batch_size: 16,
        ..PairConfig::default()
    };
    let sampler = InstanceSampler::new(config.clone(), &tokenizer).unwrap();
    assert_eq!(sampler.max_num_tokens(), 20 - tokenizer.special_tokens_overhead(true));
    let batch = BatchedMap::from_config(&config).run(&segments, &sampler).unwrap();
    assert!(!batch.is_empty());

    for instance in batch.clone().into_instances() {
        assert!(instance.len() <= 20);
        assert_eq!(instance.input_ids[0], 1);
        assert_eq!(*instance.input_ids.last().unwrap(), 2);
        assert_eq!(instance.special_tokens_mask.iter().filter(|m| **m == 1).count(), 3);
    }

    let collator = InstanceCollator::new(
        tokenizer.pad_token_id().unwrap(),
        PaddingStrategy::MaxLength(config.max_seq_length),
    );
    let padded = collator.collate(&batch.into_instances()).unwrap();
    assert_eq!(padded.seq_len, 20);
    assert!(padded.input_ids.iter().all(|ids| ids.len() == 20));
}

#[test]
fn cli_writes_both_splits_deterministically() {
    let dir = tempdir().unwrap();
    let (tokenizer_path, corpus_path) = write_fixture(dir.path(), 80);
    let first_out = dir.path().join("first");
    let second_out = dir.path().join("second");
    for out in [&first_out, &second_out] {
        let out = out.to_string_lossy().to_string();
        run(&[
            "--train-file",
            &corpus_path,
            "--tokenizer",
            &tokenizer_path,
            "--max-seq-length",
            "24",
            "--dupe-factor",
            "3",
            "--seed",
            "5",
            "--batch-size",
            "20",
            "--workers",
            "2",
            "--validation-split-percentage",
            "25",
            "--output-dir",
            &out,
        ]);
    }

    let train = read_instances(&first_out.join("train.jsonl"));
    let validation = read_instances(&first_out.join("validation.jsonl"));
    assert!(!train.is_empty());
    assert!(!validation.is_empty());
    assert!(train.len() > validation.len());
    assert!(train.iter().all(|instance| instance.len() <= 24));
    assert!(
        train
            .iter()
            .any(|instance| instance.next_sentence_label == RelationLabel::Swapped)
    );

    for name in ["train.jsonl", "validation.jsonl"] {
        assert_eq!(
            fs::read(first_out.join(name)).unwrap(),
            fs::read(second_out.join(name)).unwrap()
        );
    }
}

#[test]
fn cli_pads_and_caps_when_requested() {
    let dir = tempdir().unwrap();
    let (tokenizer_path, corpus_path) = write_fixture(dir.path(), 50);
    let validation_path = dir.path().join("validation.txt");
    fs::write(&validation_path, "the cat sat\ndogs bark\nbirds sing loudly\n").unwrap();
    let validation_path = validation_path.to_string_lossy().to_string();
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"max_seq_length": 18, "dupe_factor": 4, "short_seq_prob": 0.0}"#).unwrap();
    let config_path = config_path.to_string_lossy().to_string();
    let out = dir.path().join("out");
    let out_arg = out.to_string_lossy().to_string();

    run(&[
        "--train-file",
        &corpus_path,
        "--validation-file",
        &validation_path,
        "--tokenizer",
        &tokenizer_path,
        "--config",
        &config_path,
        "--max-train-samples",
        "5",
        "--max-eval-samples",
        "1",
        "--pad-to-max-length",
        "--output-dir",
        &out_arg,
    ]);

    let train = read_instances(&out.join("train.jsonl"));
    let validation = read_instances(&out.join("validation.jsonl"));
    assert_eq!(train.len(), 5);
    assert_eq!(validation.len(), 1);
    assert_eq!(validation[0].attention_mask.iter().filter(|m| **m == 1).count(), 11);
    for instance in train.iter().chain(&validation) {
        assert_eq!(instance.len(), 18);
        assert_eq!(instance.attention_mask.len(), 18);
        for (pos, mask) in instance.attention_mask.iter().enumerate() {
            if *mask == 0 {
                assert_eq!(instance.input_ids[pos], 3);
                assert_eq!(instance.special_tokens_mask[pos], 1);
            }
        }
    }
}

#[test]
fn cli_rejects_missing_corpus() {
    let dir = tempdir().unwrap();
    let (tokenizer_path, _) = write_fixture(dir.path(), 5);
    let missing = dir.path().join("missing.txt").to_string_lossy().to_string();
    let result = run_build_instances(
        [
            "--train-file",
            missing.as_str(),
            "--tokenizer",
            tokenizer_path.as_str(),
        ]
        .iter()
        .map(|arg| arg.to_string()),
    );
    assert!(result.is_err());
}

#[test]
fn cli_rejects_tokenizers_with_a_four_token_pair_layout() {
    let dir = tempdir().unwrap();
    let (tokenizer_path, corpus_path) = write_fixture(dir.path(), 20);
    let roberta = TOKENIZER_JSON.replace(
        r#"{ "type": "BertProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1] }"#,
        r#"{ "type": "RobertaProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1], "trim_offsets": true, "add_prefix_space": false }"#,
    );
    fs::write(&tokenizer_path, roberta).unwrap();
    let out = dir.path().join("out").to_string_lossy().to_string();
    let result = run_build_instances(
        [
            "--train-file",
            corpus_path.as_str(),
            "--tokenizer",
            tokenizer_path.as_str(),
            "--output-dir",
            out.as_str(),
        ]
        .iter()
        .map(|arg| arg.to_string()),
    );
    let err = result.unwrap_err();
    assert!(err.to_string().contains("special tokens"));
    assert!(!dir.path().join("out").join("train.jsonl").exists());
}
