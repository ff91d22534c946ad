use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN;

pub use crate::types::{Lemma, Phrase, RecordId};

/// One reviewed UI as exported by the survey, before segmentation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    /// Dense, 1-based identifier assigned upstream.
    pub id: RecordId,
    /// String-encoded list of comment blocks.
    pub comments: String,
}

/// Author of a comment slot.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    Human,
    /// Header starts with `LLM`.
    Llm,
}

impl CommentType {
    /// Column value used in segmented tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Human => "human",
            CommentType::Llm => "llm",
        }
    }
}

impl fmt::Display for CommentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed comment cut from a record's raw blob.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentSlot {
    /// Author kind read from the block header.
    pub kind: CommentType,
    /// Comment body after the header line, quotes stripped.
    pub text: String,
}

/// Problem / solution triple extracted from one critique comment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CritiqueTriple {
    /// Subject phrase of the "In the current design" clause.
    pub problem: String,
    /// Lemmatized root verb of the "To fix this" clause.
    pub solution_verb: String,
    /// Object phrase of the fix (or its subject for passive fixes).
    pub solution_obj: String,
}

impl CritiqueTriple {
    /// Triple with every field set to the `unknown` sentinel.
    pub fn unknown() -> Self {
        Self {
            problem: UNKNOWN.to_string(),
            solution_verb: UNKNOWN.to_string(),
            solution_obj: UNKNOWN.to_string(),
        }
    }

    /// False when any field failed extraction; invalid triples are dropped on flattening.
    pub fn is_valid(&self) -> bool {
        [&self.problem, &self.solution_verb, &self.solution_obj]
            .iter()
            .all(|field| is_known(field))
    }
}

impl Default for CritiqueTriple {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Verb / object pair extracted from a short task description.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskExtraction {
    /// Cleaned, singularized task text.
    pub task: String,
    /// Lemma of the verb carrying the task.
    pub verb: Option<Lemma>,
    /// Object phrase, or its head noun once simplified.
    pub obj: Option<String>,
}

/// A set of phrases judged equivalent, with its canonical member.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhraseCluster {
    /// Members in first-encountered order.
    pub members: Vec<Phrase>,
    /// Most frequent member; ties go to the first encountered.
    pub representative: Phrase,
}

impl PhraseCluster {
    /// Number of member phrases.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// True if `value` is neither empty nor the `unknown` sentinel.
pub fn is_known(value: &str) -> bool {
    !value.is_empty() && value != UNKNOWN
}
