use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for stage IO, schema, model loading and configuration failures.
///
/// Per-record extraction failures never surface through this type past the
/// record boundary; they degrade to the `unknown` sentinel instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input file '{}' was not found", path.display())]
    MissingInputFile { path: PathBuf },
    #[error("expected column '{column}' is missing from {context}")]
    SchemaMismatch { column: String, context: String },
    #[error("invalid value {value:?} in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error("no dependency annotation for text {text:?}")]
    NotAnnotated { text: String },
    #[error("malformed annotation in '{origin}' at line {line}: {reason}")]
    MalformedAnnotation {
        origin: String,
        line: usize,
        reason: String,
    },
    #[error("malformed word vectors in '{origin}' at line {line}: {reason}")]
    MalformedVectors {
        origin: String,
        line: usize,
        reason: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
