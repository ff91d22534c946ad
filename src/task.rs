use std::path::Path;

use indexmap::IndexSet;
use tracing::{info, warn};

use crate::config::{SimplificationMethod, TaskConfig};
use crate::constants::columns;
use crate::data::{Lemma, TaskExtraction};
use crate::errors::PipelineError;
use crate::nlp::inflect::singular_noun;
use crate::nlp::{DepLabel, DependencyParser, Doc, PosTag, Token};
use crate::table::Table;
use crate::tfidf::IdfTable;
use crate::transport::{read_table, write_lines, write_table};
use crate::utils::capitalize;

/// Outcome of a task table pass.
#[derive(Clone, Debug, Default)]
pub struct TaskReport {
    /// Rows processed.
    pub rows: usize,
    /// Rows with a task verb.
    pub with_verb: usize,
    /// Rows with a simplified object.
    pub with_obj: usize,
    /// Terms in the fitted IDF vocabulary.
    pub idf_terms: usize,
    /// Cleaned task texts the parser had no annotation for.
    pub unannotated: IndexSet<String>,
}

/// Strip quotes and periods, spell out `&` and `/`, and capitalize.
pub fn clean_task(text: &str) -> String {
    let cleaned = text
        .replace(['"', '\'', '.'], "")
        .replace('&', " and ")
        .replace('/', " or ")
        .replace("  ", " ");
    capitalize(&cleaned).trim().to_string()
}

/// Replace plural `NOUN` / `PROPN` forms in `doc` with their singular.
pub fn singularize_nouns(doc: &mut Doc) {
    let replacements: Vec<(usize, String)> = doc
        .tokens()
        .iter()
        .filter(|token| token.pos.is_nominal())
        .filter_map(|token| singular_noun(&token.text).map(|singular| (token.index, singular)))
        .collect();
    for (index, singular) in replacements {
        doc.set_text(index, singular);
    }
}

/// Token forms joined by spaces, with possessive clitics reattached.
pub fn render_task(doc: &Doc) -> String {
    let indices: Vec<usize> = (0..doc.len()).collect();
    doc.join_text(&indices).replace(" 's", "'s")
}

/// The verb carrying a task and the token span of its object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerbObject {
    /// Lemma of the verb.
    pub verb: Lemma,
    /// Object subtree, in document order.
    pub span: Vec<usize>,
}

/// Find the task verb and its object phrase.
///
/// When the root verb is vague (e.g. "click to view …") and the task has
/// more than one verb, its clausal complement is tried instead of the root.
/// Verbal conjuncts of the root are tried afterwards, in textual order.
pub fn extract_verb_object(doc: &Doc, vague_verbs: &[String]) -> Option<VerbObject> {
    let root = doc.find_root(|token| token.pos == PosTag::Verb)?;
    let verb_count = doc
        .tokens()
        .iter()
        .filter(|token| token.pos == PosTag::Verb)
        .count();
    let root_lemma = root.lemma.to_lowercase();

    let mut candidates: Vec<&Token> = Vec::new();
    if verb_count == 1 || !vague_verbs.iter().any(|verb| *verb == root_lemma) {
        candidates.push(root);
    } else if let Some(xcomp) = verbal_child(doc, root.index, DepLabel::Xcomp) {
        candidates.push(xcomp);
    }
    for conj in doc
        .children(root.index)
        .filter(|child| child.dep == DepLabel::Conj && child.pos == PosTag::Verb)
    {
        if !candidates.iter().any(|seen| seen.index == conj.index) {
            candidates.push(conj);
        }
    }

    candidates
        .into_iter()
        .find_map(|verb| object_of(doc, verb))
}

fn object_of(doc: &Doc, verb: &Token) -> Option<VerbObject> {
    if let Some(dobj) = child_with(doc, verb.index, DepLabel::Dobj) {
        return Some(VerbObject {
            verb: verb.lemma.clone(),
            span: doc.subtree(dobj.index),
        });
    }
    if let Some(xcomp) = verbal_child(doc, verb.index, DepLabel::Xcomp)
        && let Some(dobj) = child_with(doc, xcomp.index, DepLabel::Dobj)
    {
        return Some(VerbObject {
            verb: xcomp.lemma.clone(),
            span: doc.subtree(dobj.index),
        });
    }
    let prep = child_with(doc, verb.index, DepLabel::Prep)?;
    let pobj = child_with(doc, prep.index, DepLabel::Pobj)?;
    Some(VerbObject {
        verb: verb.lemma.clone(),
        span: doc.subtree(pobj.index),
    })
}

fn child_with(doc: &Doc, head: usize, dep: DepLabel) -> Option<&Token> {
    doc.children(head).find(|child| child.dep == dep)
}

fn verbal_child(doc: &Doc, head: usize, dep: DepLabel) -> Option<&Token> {
    doc.children(head)
        .find(|child| child.dep == dep && child.pos == PosTag::Verb)
}

/// Noun lemma in `span` with the strictly highest IDF score.
///
/// Falls back to the last noun's lemma when no noun is in the vocabulary;
/// `None` without nouns or without a fitted table.
pub fn simplify_by_idf(doc: &Doc, span: &[usize], idf: &IdfTable) -> Option<String> {
    if idf.is_empty() {
        return None;
    }
    let nouns: Vec<&Token> = span
        .iter()
        .map(|&idx| doc.token(idx))
        .filter(|token| token.pos.is_nominal())
        .collect();
    let last = nouns.last()?;
    let mut best: Option<(String, f64)> = None;
    for noun in &nouns {
        let lemma = noun.lemma.to_lowercase();
        if let Some(score) = idf.score(&lemma)
            && best.as_ref().is_none_or(|(_, top)| score > *top)
        {
            best = Some((lemma, score));
        }
    }
    Some(
        best.map(|(lemma, _)| lemma)
            .unwrap_or_else(|| last.lemma.to_lowercase()),
    )
}

/// Root lemma of the last noun chunk in `span`, else of the last `NOUN`.
pub fn simplify_by_noun_chunk(doc: &Doc, span: &[usize]) -> Option<String> {
    if let Some((_, root)) = doc.noun_chunks(span).last() {
        return Some(doc.token(*root).lemma.clone());
    }
    span.iter()
        .map(|&idx| doc.token(idx))
        .filter(|token| token.pos == PosTag::Noun)
        .last()
        .map(|token| token.lemma.clone())
}

/// A cleaned, parsed and singularized task.
#[derive(Clone, Debug)]
pub struct ParsedTask {
    /// Rewritten task text.
    pub task: String,
    doc: Option<Doc>,
    verb_object: Option<VerbObject>,
}

impl ParsedTask {
    /// Lemma of the task verb.
    pub fn verb(&self) -> Option<&str> {
        self.verb_object.as_ref().map(|found| found.verb.as_str())
    }

    /// Surface text of the full object phrase.
    pub fn object_phrase(&self) -> Option<String> {
        let doc = self.doc.as_ref()?;
        let found = self.verb_object.as_ref()?;
        Some(doc.join_text(&found.span))
    }

    /// Reduce the object phrase to one head noun.
    pub fn simplify(&self, method: SimplificationMethod, idf: &IdfTable) -> Option<String> {
        let doc = self.doc.as_ref()?;
        let found = self.verb_object.as_ref()?;
        match method {
            SimplificationMethod::Idf => simplify_by_idf(doc, &found.span, idf),
            SimplificationMethod::NounChunk => simplify_by_noun_chunk(doc, &found.span),
        }
    }
}

/// Parses task descriptions and extracts their verb / object pair.
pub struct TaskExtractor<'a> {
    parser: &'a dyn DependencyParser,
    config: &'a TaskConfig,
    vague_verbs: Vec<String>,
}

impl<'a> TaskExtractor<'a> {
    pub fn new(parser: &'a dyn DependencyParser, config: &'a TaskConfig) -> Self {
        Self {
            parser,
            config,
            vague_verbs: config
                .vague_verbs
                .iter()
                .map(|verb| verb.to_lowercase())
                .collect(),
        }
    }

    /// Clean, parse, singularize and find the verb / object of one task.
    pub fn parse_task(&self, raw: &str, unannotated: &mut IndexSet<String>) -> ParsedTask {
        let cleaned = clean_task(raw);
        if cleaned.is_empty() {
            return ParsedTask {
                task: cleaned,
                doc: None,
                verb_object: None,
            };
        }
        let mut doc = match self.parser.parse(&cleaned) {
            Ok(doc) => doc,
            Err(err) => {
                match err {
                    PipelineError::NotAnnotated { text } => {
                        unannotated.insert(text);
                    }
                    other => warn!("[uicrit:tasks] parse failed for {cleaned:?}: {other}"),
                }
                return ParsedTask {
                    task: cleaned,
                    doc: None,
                    verb_object: None,
                };
            }
        };
        singularize_nouns(&mut doc);
        let verb_object = extract_verb_object(&doc, &self.vague_verbs);
        ParsedTask {
            task: render_task(&doc),
            doc: Some(doc),
            verb_object,
        }
    }

    /// Rewrite `task` and fill `verb` / `obj` for every row.
    ///
    /// Every task is parsed and IDF is fitted over all object phrases before
    /// any object is reduced to its head noun.
    pub fn extract_table(&self, table: &Table) -> Result<(Table, TaskReport), PipelineError> {
        let task_idx = table.require_column(&self.config.task_column, "task extractor input")?;
        let mut report = TaskReport::default();

        let parsed: Vec<ParsedTask> = table
            .column(task_idx)
            .map(|raw| self.parse_task(raw, &mut report.unannotated))
            .collect();

        let idf = match self.config.simplification {
            SimplificationMethod::Idf => {
                IdfTable::fit(parsed.iter().filter_map(ParsedTask::object_phrase))
            }
            SimplificationMethod::NounChunk => IdfTable::default(),
        };
        report.idf_terms = idf.len();

        let extractions: Vec<TaskExtraction> = parsed
            .iter()
            .map(|task| TaskExtraction {
                task: task.task.clone(),
                verb: task.verb().map(str::to_string),
                obj: task.simplify(self.config.simplification, &idf),
            })
            .collect();

        report.rows = extractions.len();
        report.with_verb = extractions.iter().filter(|row| row.verb.is_some()).count();
        report.with_obj = extractions.iter().filter(|row| row.obj.is_some()).count();

        let mut output = table.clone();
        output.set_column(
            &self.config.task_column,
            extractions.iter().map(|row| row.task.clone()).collect(),
        )?;
        output.set_column(
            columns::TASK_VERB,
            extractions
                .iter()
                .map(|row| row.verb.clone().unwrap_or_default())
                .collect(),
        )?;
        output.set_column(
            columns::TASK_OBJ,
            extractions
                .into_iter()
                .map(|row| row.obj.unwrap_or_default())
                .collect(),
        )?;
        Ok((output, report))
    }
}

/// Read `input`, extract task verbs and objects and write the result to `output`.
pub fn run_task_extractor(
    input: &Path,
    output: &Path,
    parser: &dyn DependencyParser,
    config: &TaskConfig,
    unannotated_path: Option<&Path>,
) -> Result<TaskReport, PipelineError> {
    let table = read_table(input)?;
    let extractor = TaskExtractor::new(parser, config);
    let (extracted, report) = extractor.extract_table(&table)?;
    write_table(output, &extracted, config.write_bom)?;
    info!(
        "[uicrit:tasks] {} tasks, {} with verb, {} with object ({:?}, {} idf terms) -> {}",
        report.rows,
        report.with_verb,
        report.with_obj,
        config.simplification,
        report.idf_terms,
        output.display()
    );
    if !report.unannotated.is_empty() {
        warn!(
            "[uicrit:tasks] {} task texts had no annotation",
            report.unannotated.len()
        );
        if let Some(path) = unannotated_path {
            write_lines(path, &report.unannotated)?;
        }
    }
    Ok(report)
}
