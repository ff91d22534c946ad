use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::errors::PipelineError;
use crate::types::Vector;

/// Static word embeddings keyed by surface form.
#[derive(Clone, Debug, Default)]
pub struct WordVectors {
    dim: usize,
    table: HashMap<String, Vector>,
}

impl WordVectors {
    /// Empty table of width `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            table: HashMap::new(),
        }
    }

    /// Load the whitespace-separated text format shared by GloVe, word2vec and fastText.
    ///
    /// A leading `<count> <dim>` header line is accepted and skipped.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }
        let reader = BufReader::new(File::open(path)?);
        let vectors = Self::from_reader(reader, &path.display().to_string())?;
        info!(
            "[uicrit:nlp] loaded {} word vectors (dim {}) from {}",
            vectors.len(),
            vectors.dim(),
            path.display()
        );
        Ok(vectors)
    }

    /// Read vectors from any buffered source; `origin` names it in errors.
    pub fn from_reader<R: BufRead>(reader: R, origin: &str) -> Result<Self, PipelineError> {
        let mut vectors = Self::new(0);
        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_idx + 1;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: Vec<&str> = parts.collect();
            if line_idx == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }
            let vector = values
                .iter()
                .map(|value| value.parse::<f32>())
                .collect::<Result<Vector, _>>()
                .map_err(|err| PipelineError::MalformedVectors {
                    origin: origin.to_string(),
                    line: line_no,
                    reason: err.to_string(),
                })?;
            vectors.insert(word, vector).map_err(|reason| {
                PipelineError::MalformedVectors {
                    origin: origin.to_string(),
                    line: line_no,
                    reason,
                }
            })?;
        }
        Ok(vectors)
    }

    /// Add or replace the vector for `word`.
    pub fn insert(&mut self, word: &str, vector: Vector) -> Result<(), String> {
        if vector.is_empty() {
            return Err(format!("word '{word}' has no components"));
        }
        if self.dim == 0 {
            self.dim = vector.len();
        }
        if vector.len() != self.dim {
            return Err(format!(
                "word '{word}' has {} components, expected {}",
                vector.len(),
                self.dim
            ));
        }
        self.table.insert(word.to_string(), vector);
        Ok(())
    }

    /// Vector for `word`, falling back to its lowercase form.
    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.table
            .get(word)
            .or_else(|| self.table.get(&word.to_lowercase()))
            .map(Vec::as_slice)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of words with a vector.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
