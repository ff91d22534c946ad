//! Pre-computed dependency parses read from CoNLL-U files.
//!
//! Each sentence block carries ten tab-separated columns
//! (`ID FORM LEMMA UPOS XPOS FEATS HEAD DEPREL DEPS MISC`) and an optional
//! `# text = …` comment. Sentences following a `# newdoc` marker are grouped
//! into one document until the next marker; files without markers treat every
//! sentence as its own document. Documents are keyed by their
//! whitespace-normalized text.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::nlp::DependencyParser;
use crate::nlp::doc::{DepLabel, Doc, PosTag, Token};
use crate::types::AnnotatedText;
use crate::utils::normalize_inline_whitespace;

/// Lookup table from text to its pre-computed parse.
#[derive(Clone, Debug, Default)]
pub struct AnnotationStore {
    docs: HashMap<AnnotatedText, Doc>,
}

impl AnnotationStore {
    /// An empty store; every lookup fails with `NotAnnotated`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge every CoNLL-U file in `paths`; later files win on duplicate texts.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, PipelineError> {
        let mut store = Self::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                return Err(PipelineError::MissingInputFile {
                    path: path.to_path_buf(),
                });
            }
            let raw = std::fs::read_to_string(path)?;
            let before = store.len();
            store.extend_from_str(&raw, &path.display().to_string())?;
            info!(
                "[uicrit:nlp] loaded {} annotated documents from {}",
                store.len() - before,
                path.display()
            );
        }
        Ok(store)
    }

    /// Parse CoNLL-U text; `origin` names the source in error messages.
    pub fn from_conllu_str(raw: &str, origin: &str) -> Result<Self, PipelineError> {
        let mut store = Self::new();
        store.extend_from_str(raw, origin)?;
        Ok(store)
    }

    /// Register a document under `text`.
    pub fn insert(&mut self, text: &str, doc: Doc) {
        self.docs.insert(normalize_inline_whitespace(text), doc);
    }

    /// Number of annotated documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn extend_from_str(&mut self, raw: &str, origin: &str) -> Result<(), PipelineError> {
        let mut reader = DocumentBuilder::default();
        for (line_idx, line) in raw.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                reader.end_sentence(self, origin)?;
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                let comment = comment.trim();
                if comment.starts_with("newdoc") {
                    reader.end_sentence(self, origin)?;
                    reader.flush_document(self);
                    reader.grouped = true;
                } else if let Some(text) = comment
                    .strip_prefix("text")
                    .map(str::trim_start)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    reader.sentence_text = Some(text.trim().to_string());
                }
                continue;
            }
            reader.push_line(line, line_no, origin)?;
        }
        reader.end_sentence(self, origin)?;
        reader.flush_document(self);
        Ok(())
    }
}

impl DependencyParser for AnnotationStore {
    fn parse(&self, text: &str) -> Result<Doc, PipelineError> {
        let key = normalize_inline_whitespace(text);
        match self.docs.get(&key) {
            Some(doc) => Ok(doc.clone()),
            None => {
                debug!("[uicrit:nlp] no annotation for {key:?}");
                Err(PipelineError::NotAnnotated { text: key })
            }
        }
    }
}

#[derive(Default)]
struct DocumentBuilder {
    grouped: bool,
    sentence: Vec<Token>,
    sentence_line: usize,
    sentence_text: Option<String>,
    doc_tokens: Vec<Token>,
    doc_texts: Vec<String>,
}

impl DocumentBuilder {
    fn push_line(&mut self, line: &str, line_no: usize, origin: &str) -> Result<(), PipelineError> {
        let malformed = |reason: String| PipelineError::MalformedAnnotation {
            origin: origin.to_string(),
            line: line_no,
            reason,
        };
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != 10 {
            return Err(malformed(format!(
                "expected 10 tab-separated columns, found {}",
                columns.len()
            )));
        }
        // Multiword ranges (`1-2`) and empty nodes (`1.1`) carry no tree position.
        if columns[0].contains('-') || columns[0].contains('.') {
            return Ok(());
        }
        let id: usize = columns[0]
            .parse()
            .map_err(|_| malformed(format!("invalid token id '{}'", columns[0])))?;
        if id != self.sentence.len() + 1 {
            return Err(malformed(format!(
                "token id {id} out of sequence (expected {})",
                self.sentence.len() + 1
            )));
        }
        let pos: PosTag = columns[3].parse().map_err(malformed)?;
        let head: usize = columns[6]
            .parse()
            .map_err(|_| malformed(format!("invalid head '{}'", columns[6])))?;
        if self.sentence.is_empty() {
            self.sentence_line = line_no;
        }
        let lemma = match columns[2] {
            "_" if columns[1] != "_" => columns[1].to_lowercase(),
            lemma => lemma.to_string(),
        };
        self.sentence.push(Token {
            index: 0,
            text: columns[1].to_string(),
            lemma,
            pos,
            dep: DepLabel::parse(columns[7]),
            // Sentence-local 1-based heads; rebased when the sentence closes.
            head: head.checked_sub(1),
        });
        Ok(())
    }

    fn end_sentence(&mut self, store: &mut AnnotationStore, origin: &str) -> Result<(), PipelineError> {
        if self.sentence.is_empty() {
            self.sentence_text = None;
            return Ok(());
        }
        check_heads(&self.sentence).map_err(|reason| PipelineError::MalformedAnnotation {
            origin: origin.to_string(),
            line: self.sentence_line,
            reason,
        })?;
        let offset = self.doc_tokens.len();
        let text = self.sentence_text.take().unwrap_or_else(|| {
            self.sentence
                .iter()
                .map(|token| token.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });
        for mut token in self.sentence.drain(..) {
            token.head = token.head.map(|head| head + offset);
            self.doc_tokens.push(token);
        }
        self.doc_texts.push(text);
        if !self.grouped {
            self.flush_document(store);
        }
        Ok(())
    }

    fn flush_document(&mut self, store: &mut AnnotationStore) {
        if self.doc_tokens.is_empty() {
            self.doc_texts.clear();
            return;
        }
        let text = self.doc_texts.join(" ");
        store.insert(&text, Doc::new(std::mem::take(&mut self.doc_tokens)));
        self.doc_texts.clear();
    }
}

/// Rejects out-of-range heads and a `ROOT` with a governor.
///
/// Following heads from any token has to reach a root within `len` steps.
fn check_heads(sentence: &[Token]) -> Result<(), String> {
    let len = sentence.len();
    for (idx, token) in sentence.iter().enumerate() {
        let id = idx + 1;
        match token.head {
            Some(head) if head >= len => {
                return Err(format!("token {id} has head {} beyond sentence length {len}", head + 1));
            }
            Some(head) if token.dep == DepLabel::Root => {
                return Err(format!("ROOT token {id} has head {} instead of 0", head + 1));
            }
            _ => {}
        }
    }
    for start in 0..len {
        let mut current = start;
        let mut steps = 0;
        while let Some(head) = sentence[current].head {
            steps += 1;
            if steps > len {
                return Err(format!("cyclic heads reachable from token {}", start + 1));
            }
            current = head;
        }
    }
    Ok(())
}
