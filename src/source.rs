//! Line corpora read from text, JSON-lines, or JSON files.
//!
//! A corpus is an ordered list of raw lines. Plain-text files keep blank lines
//! as empty entries; nothing here interprets them as document boundaries.
//! JSON records contribute one column, chosen once per file from the first
//! record.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::constants::corpus::TEXT_FIELD;
use crate::errors::PairsError;
use crate::tokenizer::HfTokenizer;
use crate::types::{Segment, TextLine};

/// Recognized corpus file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorpusFormat {
    /// One line of text per segment.
    Text,
    /// One JSON record per line.
    JsonLines,
    /// A JSON array of records, or JSON lines when the file is not an array.
    Json,
}

impl CorpusFormat {
    /// Format implied by the file extension, if supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("txt") {
            Some(Self::Text)
        } else if ext.eq_ignore_ascii_case("jsonl") {
            Some(Self::JsonLines)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// Ordered lines loaded from one file or a directory tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineCorpus {
    lines: Vec<TextLine>,
    files: Vec<PathBuf>,
}

impl LineCorpus {
    /// Wrap lines that are already in memory.
    pub fn from_lines(lines: Vec<TextLine>) -> Self {
        Self {
            lines,
            files: Vec::new(),
        }
    }

    /// Load a corpus file, or every supported file under a directory in sorted path order.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PairsError> {
        let path = path.as_ref();
        let files = corpus_files(path)?;
        if files.is_empty() {
            return Err(PairsError::Corpus {
                path: path.to_path_buf(),
                reason: "no .txt, .jsonl, or .json files found".into(),
            });
        }
        let mut lines = Vec::new();
        for file in &files {
            let before = lines.len();
            read_file(file, &mut lines)?;
            debug!(
                file = %file.display(),
                lines = lines.len() - before,
                "corpus file loaded"
            );
        }
        info!(
            path = %path.display(),
            files = files.len(),
            lines = lines.len(),
            "corpus loaded"
        );
        Ok(Self { lines, files })
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// Files the lines were read from, in load order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<TextLine> {
        self.lines
    }

    /// Encode every line with special tokens excluded.
    pub fn tokenize(&self, tokenizer: &HfTokenizer) -> Result<Vec<Segment>, PairsError> {
        let segments = tokenizer.encode_lines(&self.lines)?;
        let tokens: usize = segments.iter().map(Vec::len).sum();
        debug!(lines = segments.len(), tokens, "corpus tokenized");
        Ok(segments)
    }
}

/// Column read from every record of a file, decided by its first record:
/// `"text"` when present, else the first string field in file order.
///
/// Bare string records have no columns and yield `None`.
pub fn text_column(first: &Value) -> Option<String> {
    let map = first.as_object()?;
    if map.get(TEXT_FIELD).is_some_and(Value::is_string) {
        return Some(TEXT_FIELD.to_string());
    }
    map.iter()
        .find(|(_, value)| value.is_string())
        .map(|(key, _)| key.clone())
}

/// Text of one record: the bare string itself, or the string in `column`.
pub fn extract_text<'a>(value: &'a Value, column: Option<&str>) -> Option<&'a str> {
    match (value, column) {
        (Value::String(text), _) => Some(text.as_str()),
        (Value::Object(map), Some(column)) => map.get(column).and_then(Value::as_str),
        _ => None,
    }
}

fn corpus_files(path: &Path) -> Result<Vec<PathBuf>, PairsError> {
    if path.is_file() {
        return match CorpusFormat::from_path(path) {
            Some(_) => Ok(vec![path.to_path_buf()]),
            None => Err(PairsError::Corpus {
                path: path.to_path_buf(),
                reason: "unsupported file extension (expected .txt, .jsonl, or .json)".into(),
            }),
        };
    }
    if !path.is_dir() {
        return Err(PairsError::Corpus {
            path: path.to_path_buf(),
            reason: "path does not exist".into(),
        });
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|file| CorpusFormat::from_path(file).is_some())
        .collect();
    files.sort();
    Ok(files)
}

fn read_file(path: &Path, lines: &mut Vec<TextLine>) -> Result<(), PairsError> {
    let raw = fs::read_to_string(path).map_err(|err| PairsError::Corpus {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    match CorpusFormat::from_path(path) {
        Some(CorpusFormat::Text) => {
            lines.extend(raw.lines().map(str::to_string));
        }
        Some(CorpusFormat::Json) if raw.trim_start().starts_with('[') => {
            let records: Vec<Value> =
                serde_json::from_str(&raw).map_err(|err| PairsError::Corpus {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                })?;
            let numbered = records
                .into_iter()
                .enumerate()
                .map(|(idx, record)| Ok((format!("record {}", idx + 1), record)));
            read_records(path, numbered, lines)?;
        }
        Some(CorpusFormat::JsonLines | CorpusFormat::Json) => {
            let numbered = raw
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(line_no, line)| {
                    let place = format!("line {}", line_no + 1);
                    match serde_json::from_str::<Value>(line) {
                        Ok(record) => Ok((place, record)),
                        Err(err) => Err(PairsError::Corpus {
                            path: path.to_path_buf(),
                            reason: format!("{place}: {err}"),
                        }),
                    }
                });
            read_records(path, numbered, lines)?;
        }
        None => {}
    }
    Ok(())
}

/// Append the text column of each record. The column is fixed by the first record.
fn read_records(
    path: &Path,
    records: impl Iterator<Item = Result<(String, Value), PairsError>>,
    lines: &mut Vec<TextLine>,
) -> Result<(), PairsError> {
    let mut column: Option<Option<String>> = None;
    for record in records {
        let (place, value) = record?;
        let column = column.get_or_insert_with(|| text_column(&value));
        let text = extract_text(&value, column.as_deref()).ok_or_else(|| PairsError::Corpus {
            path: path.to_path_buf(),
            reason: match column.as_deref() {
                Some(name) => format!("{place}: record has no string field '{name}'"),
                None => format!("{place}: record has no string field"),
            },
        })?;
        lines.push(text.to_string());
    }
    if let Some(Some(name)) = &column {
        debug!(file = %path.display(), column = %name, "text column selected");
    }
    Ok(())
}
