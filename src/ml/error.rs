use std::path::PathBuf;
use thiserror::Error;

/// A record could not be turned into a feature vector.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("column '{column}' expects a number, got {kind} {value}")]
    NotNumeric {
        column: &'static str,
        kind: &'static str,
        value: String,
    },
    #[error("feature vector has {actual} columns, model expects {expected}")]
    Width { expected: usize, actual: usize },
}

/// The persisted encoder mapping is malformed.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoder file must be a JSON object keyed by column, got {0}")]
    NotAnObject(&'static str),
    #[error("encoder for column '{0}' is missing")]
    MissingColumn(String),
    #[error("encoder for column '{column}' must be an object or an array, got {kind}")]
    Malformed { column: String, kind: &'static str },
    #[error("encoder for column '{column}' has non-integer index '{key}'")]
    BadIndex { column: String, key: String },
    #[error("encoder for column '{column}' skips index {index}")]
    MissingIndex { column: String, index: usize },
    #[error("encoder for column '{column}' has a {kind} class at index {index}, expected string")]
    NonStringClass {
        column: String,
        index: usize,
        kind: &'static str,
    },
    #[error("encoder for column '{column}' lists class '{class}' more than once")]
    DuplicateClass { column: String, class: String },
}

/// Loading or writing one of the model artifacts failed.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid encoders in {path}: {source}")]
    Encoders { path: PathBuf, source: EncoderError },
    #[error("artifact mismatch: {0}")]
    Mismatch(String),
}

/// The training input could not be read or interpreted.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("JSON dataset must be an array of objects (entry {0} is not an object)")]
    NotAnObject(usize),
    #[error("dataset has no header row")]
    MissingHeader,
    #[error("dataset is missing required column '{0}'")]
    MissingColumn(String),
    #[error("line {line}: expected {expected} cells, found {actual}")]
    RaggedRow {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[error("row {row}: label must be 0 or 1, got '{value}'")]
    BadLabel { row: usize, value: String },
}

/// Training could not produce a model.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no labeled rows to train on")]
    NoRows,
    #[error("need at least {needed} labeled rows to split, got {actual}")]
    TooFewRows { needed: usize, actual: usize },
    #[error("invalid forest parameters: {0}")]
    InvalidParams(String),
    #[error("row {row}: {source}")]
    Encode { row: usize, source: EncodeError },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Linfa(#[from] linfa::Error),
}

/// A metric could not be computed at all (as opposed to being undefined).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    #[error("cannot evaluate an empty test set")]
    Empty,
    #[error("{predictions} predictions for {targets} targets")]
    LengthMismatch { predictions: usize, targets: usize },
    #[error("label {0} is not binary")]
    NonBinaryLabel(usize),
}
