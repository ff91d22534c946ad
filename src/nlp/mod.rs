//! Linguistic collaborators: parse trees, annotation lookup, word vectors,
//! stop words and noun inflection.

use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::config::ModelConfig;
use crate::errors::PipelineError;

/// CoNLL-U annotation store.
pub mod conllu;
/// Parsed documents and their tags.
pub mod doc;
/// Noun singularization.
pub mod inflect;
/// Stop-word sets.
pub mod stop_words;
/// Word vector tables.
pub mod vectors;

pub use conllu::AnnotationStore;
pub use doc::{DepLabel, Doc, PosTag, Token};
pub use stop_words::StopWords;
pub use vectors::WordVectors;

static PHRASE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("phrase token pattern compiles"));

/// Produces a dependency parse for a piece of text.
///
/// A text the parser cannot handle is reported as
/// [`PipelineError::NotAnnotated`]; callers treat that as a per-record failure.
pub trait DependencyParser {
    /// Parse `text` into a [`Doc`].
    fn parse(&self, text: &str) -> Result<Doc, PipelineError>;
}

/// Parser, vectors and stop words loaded once per run.
pub struct LanguageModel {
    parser: Box<dyn DependencyParser>,
    vectors: WordVectors,
    stop_words: StopWords,
}

impl LanguageModel {
    /// Assemble a model from already-loaded parts.
    pub fn new(
        parser: Box<dyn DependencyParser>,
        vectors: WordVectors,
        stop_words: StopWords,
    ) -> Self {
        Self {
            parser,
            vectors,
            stop_words,
        }
    }

    /// Load every resource named by `config`.
    ///
    /// A missing vectors path yields an empty table: every phrase is then
    /// unembeddable and maps to itself.
    pub fn load(config: &ModelConfig) -> Result<Self, PipelineError> {
        let parser = AnnotationStore::from_files(&config.annotations)?;
        let vectors = match &config.vectors {
            Some(path) => WordVectors::from_file(path)?,
            None => WordVectors::default(),
        };
        let stop_words = StopWords::english().with_extra(&config.extra_stop_words);
        info!(
            "[uicrit:nlp] model ready: {} annotated texts, {} word vectors",
            parser.len(),
            vectors.len()
        );
        Ok(Self::new(Box::new(parser), vectors, stop_words))
    }

    /// Parser used by the extraction stages.
    pub fn parser(&self) -> &dyn DependencyParser {
        self.parser.as_ref()
    }

    pub fn vectors(&self) -> &WordVectors {
        &self.vectors
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    /// Mean vector of the non-stop-word tokens of `phrase` that have a vector.
    pub fn embed(&self, phrase: &str) -> Option<Vec<f32>> {
        let mut sum = vec![0.0f32; self.vectors.dim()];
        let mut count = 0usize;
        for token in phrase_tokens(phrase) {
            if self.stop_words.contains(token) {
                continue;
            }
            let Some(vector) = self.vectors.get(token) else {
                continue;
            };
            for (acc, value) in sum.iter_mut().zip(vector) {
                *acc += value;
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let scale = 1.0 / count as f32;
        sum.iter_mut().for_each(|value| *value *= scale);
        Some(sum)
    }
}

/// Split a phrase into word runs and single punctuation marks.
pub fn phrase_tokens(phrase: &str) -> impl Iterator<Item = &str> + '_ {
    PHRASE_TOKEN.find_iter(phrase).map(|found| found.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LanguageModel {
        let mut vectors = WordVectors::new(2);
        vectors.insert("font", vec![1.0, 0.0]).unwrap();
        vectors.insert("size", vec![0.0, 1.0]).unwrap();
        vectors.insert("the", vec![5.0, 5.0]).unwrap();
        LanguageModel::new(
            Box::new(AnnotationStore::new()),
            vectors,
            StopWords::english(),
        )
    }

    #[test]
    fn phrase_tokens_split_punctuation() {
        let tokens: Vec<&str> = phrase_tokens("drop-down, menu").collect();
        assert_eq!(tokens, vec!["drop", "-", "down", ",", "menu"]);
    }

    #[test]
    fn embedding_averages_content_words() {
        let model = model();
        assert_eq!(model.embed("the Font size"), Some(vec![0.5, 0.5]));
        assert_eq!(model.embed("the"), None);
        assert_eq!(model.embed("unseen words"), None);
    }

    #[test]
    fn parser_misses_are_per_record() {
        let model = model();
        assert!(matches!(
            model.parser().parse("anything"),
            Err(PipelineError::NotAnnotated { .. })
        ));
    }
}
