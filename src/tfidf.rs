use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::task::IDF_TOKEN_PATTERN;

static IDF_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IDF_TOKEN_PATTERN).expect("idf token pattern compiles"));

/// Smoothed IDF scores, `ln((1 + n) / (1 + df)) + 1`, over lowercased terms
/// of two or more word characters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdfTable {
    documents: usize,
    scores: HashMap<String, f64>,
}

impl IdfTable {
    /// Fit over every document at once; call before scoring any single row.
    pub fn fit<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut documents_seen = 0usize;
        for document in documents {
            documents_seen += 1;
            let lowered = document.as_ref().to_lowercase();
            let terms: HashSet<&str> = IDF_TOKEN
                .find_iter(&lowered)
                .map(|term| term.as_str())
                .collect();
            for term in terms {
                *document_frequency.entry(term.to_string()).or_default() += 1;
            }
        }
        let n = documents_seen as f64;
        let scores = document_frequency
            .into_iter()
            .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .collect();
        Self {
            documents: documents_seen,
            scores,
        }
    }

    /// Score for `term` (case-insensitive); `None` outside the vocabulary.
    pub fn score(&self, term: &str) -> Option<f64> {
        self.scores.get(&term.to_lowercase()).copied()
    }

    /// Number of documents the table was fitted on.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Vocabulary size.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// `true` before any object phrase was fitted.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
