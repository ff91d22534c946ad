use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{ExtractorConfig, OutputConfig};
use crate::constants::UNKNOWN;
use crate::constants::columns;
use crate::constants::extract::{
    BRACKET_ASIDE_PATTERN, CRITIQUE_TEMPLATE_PATTERN, PAREN_ASIDE_PATTERN, QUOTED_ASIDE_PATTERN,
};
use crate::data::CritiqueTriple;
use crate::errors::PipelineError;
use crate::metrics::{ExtractionCoverage, extraction_coverage};
use crate::nlp::{DepLabel, DependencyParser, Doc, PosTag};
use crate::table::Table;
use crate::transport::{read_table, write_lines, write_table};
use crate::utils::{capitalize, clean_or_unknown};

static CRITIQUE_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(CRITIQUE_TEMPLATE_PATTERN).expect("critique template pattern compiles")
});
static PAREN_ASIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PAREN_ASIDE_PATTERN).expect("paren aside pattern compiles"));
static BRACKET_ASIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BRACKET_ASIDE_PATTERN).expect("bracket aside pattern compiles"));
static QUOTED_ASIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(QUOTED_ASIDE_PATTERN).expect("quoted aside pattern compiles"));

/// Outcome of an extractor table pass.
#[derive(Clone, Debug, Default)]
pub struct ExtractionReport {
    /// Field coverage over non-blank comment texts.
    pub coverage: ExtractionCoverage,
    /// `comment{i}_text` columns that were absent and skipped.
    pub skipped_columns: Vec<String>,
    /// Clause texts the parser had no annotation for, in first-seen order.
    pub unannotated: IndexSet<String>,
}

/// Remove parenthetical, bracketed and single-quoted asides plus double quotes.
pub fn strip_asides(text: &str) -> String {
    let text = PAREN_ASIDE.replace_all(text, "");
    let text = BRACKET_ASIDE.replace_all(&text, "");
    let text = QUOTED_ASIDE.replace_all(&text, "");
    text.replace('"', "").replace("  ", " ").trim().to_string()
}

/// Split a critique into its (problem, solution) clauses, both capitalized.
///
/// `None` when the text does not follow the template.
pub fn split_template(text: &str) -> Option<(String, String)> {
    let stripped = strip_asides(text);
    let captures = CRITIQUE_TEMPLATE.captures(&stripped)?;
    let clause = |idx: usize| {
        captures
            .get(idx)
            .map(|found| capitalize(found.as_str().trim()))
            .unwrap_or_default()
    };
    Some((clause(1), clause(2)))
}

/// Subject, verb and object found under a clause root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClauseParts {
    /// Root lemma.
    pub verb: Option<String>,
    /// First `nsubj` / `nsubjpass` phrase.
    pub subject: Option<String>,
    /// Object phrase chosen by [`analyze_clause`].
    pub object: Option<String>,
}

/// Read the root verb, its subject and its object out of a parsed clause.
///
/// The root is the first `ROOT` token tagged `VERB` or `AUX`. Objects are
/// searched in a fixed order: a direct object of the root, the direct object
/// of its first verbal `xcomp`, then the `pobj` of its first `prep`.
pub fn analyze_clause(doc: &Doc) -> ClauseParts {
    let Some(root) = doc.find_root(|token| token.pos.is_verbal()) else {
        return ClauseParts::default();
    };
    let subject = doc
        .children(root.index)
        .find(|child| child.dep.is_subject())
        .map(|child| nominal_phrase(doc, child.index));
    let object = find_object(doc, root.index).map(|idx| nominal_phrase(doc, idx));
    ClauseParts {
        verb: Some(root.lemma.clone()),
        subject,
        object,
    }
}

fn find_object(doc: &Doc, root: usize) -> Option<usize> {
    if let Some(object) = doc.children(root).find(|child| child.dep.is_direct_object()) {
        return Some(object.index);
    }
    if let Some(xcomp) = doc
        .children(root)
        .find(|child| child.dep == DepLabel::Xcomp && child.pos == PosTag::Verb)
        && let Some(object) = doc
            .children(xcomp.index)
            .find(|child| child.dep.is_direct_object())
    {
        return Some(object.index);
    }
    let prep = doc.children(root).find(|child| child.dep == DepLabel::Prep)?;
    doc.children(prep.index)
        .find(|child| child.dep == DepLabel::Pobj)
        .map(|child| child.index)
}

/// Lemmas of the subtree under `head`, cut at the first adposition, without
/// determiners or pronouns.
pub fn nominal_phrase(doc: &Doc, head: usize) -> String {
    doc.subtree(head)
        .into_iter()
        .map(|idx| doc.token(idx))
        .take_while(|token| token.pos != PosTag::Adp)
        .filter(|token| !matches!(token.pos, PosTag::Det | PosTag::Pron))
        .map(|token| token.lemma.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns critique comments into problem / solution triples.
///
/// A critique reads "In the current design, <problem>. To fix this, <solution>."
/// Fields that cannot be determined become `unknown` on their own.
pub struct CritiqueExtractor<'a> {
    parser: &'a dyn DependencyParser,
}

impl<'a> CritiqueExtractor<'a> {
    pub fn new(parser: &'a dyn DependencyParser) -> Self {
        Self { parser }
    }

    /// Extract the triple for one comment text.
    pub fn extract(&self, text: &str) -> CritiqueTriple {
        self.extract_tracked(text, &mut IndexSet::new())
    }

    /// [`Self::extract`], recording clause texts that had no parse in `unannotated`.
    pub fn extract_tracked(&self, text: &str, unannotated: &mut IndexSet<String>) -> CritiqueTriple {
        if text.trim().is_empty() {
            return CritiqueTriple::unknown();
        }
        let Some((problem_clause, solution_clause)) = split_template(text) else {
            return CritiqueTriple::unknown();
        };

        let mut problem = UNKNOWN.to_string();
        if let Some(doc) = self.parse_clause(&problem_clause, unannotated)
            && let Some(subject) = analyze_clause(&doc).subject
        {
            problem = subject;
        }

        let mut solution_verb = UNKNOWN.to_string();
        let mut solution_obj = UNKNOWN.to_string();
        if let Some(doc) = self.parse_clause(&solution_clause, unannotated) {
            let parts = analyze_clause(&doc);
            if let Some(verb) = parts.verb {
                solution_verb = verb;
            }
            // Passive fixes ("the button should be enlarged") carry the target as subject.
            if let Some(object) = parts.object.or(parts.subject) {
                solution_obj = object;
            }
        }

        CritiqueTriple {
            problem: clean_or_unknown(&problem),
            solution_verb: clean_or_unknown(&solution_verb),
            solution_obj: clean_or_unknown(&solution_obj),
        }
    }

    fn parse_clause(&self, clause: &str, unannotated: &mut IndexSet<String>) -> Option<Doc> {
        if clause.is_empty() {
            return None;
        }
        match self.parser.parse(clause) {
            Ok(doc) => Some(doc),
            Err(PipelineError::NotAnnotated { text }) => {
                unannotated.insert(text);
                None
            }
            Err(err) => {
                warn!("[uicrit:extract] parse failed, field left unknown: {err}");
                None
            }
        }
    }

    /// Add `comment{i}_problem`, `_solution_verb` and `_solution_obj` for every
    /// `comment{i}_text` column present.
    pub fn extract_table(
        &self,
        table: &Table,
        config: &ExtractorConfig,
    ) -> Result<(Table, ExtractionReport), PipelineError> {
        let mut output = table.clone();
        let mut report = ExtractionReport::default();
        let mut triples = Vec::new();
        for slot in 1..=config.max_comments {
            let text_column = columns::slot_text(slot);
            let Some(text_idx) = table.column_index(&text_column) else {
                warn!("[uicrit:extract] column '{text_column}' not found; skipping");
                report.skipped_columns.push(text_column);
                continue;
            };
            let mut problems = Vec::with_capacity(table.len());
            let mut verbs = Vec::with_capacity(table.len());
            let mut objects = Vec::with_capacity(table.len());
            for text in table.column(text_idx) {
                let triple = self.extract_tracked(text, &mut report.unannotated);
                if !text.trim().is_empty() {
                    triples.push(triple.clone());
                }
                problems.push(triple.problem);
                verbs.push(triple.solution_verb);
                objects.push(triple.solution_obj);
            }
            output.set_column(&columns::slot_problem(slot), problems)?;
            output.set_column(&columns::slot_solution_verb(slot), verbs)?;
            output.set_column(&columns::slot_solution_obj(slot), objects)?;
            debug!("[uicrit:extract] processed {text_column}");
        }
        if config.drop_source_columns {
            let sources: Vec<String> = (1..=config.max_comments)
                .flat_map(|slot| [columns::slot_type(slot), columns::slot_text(slot)])
                .collect();
            output.drop_columns(|name| sources.iter().any(|source| source == name));
        }
        report.coverage = extraction_coverage(&triples);
        Ok((output, report))
    }
}

/// Read `input`, extract every comment slot and write the result to `output`.
///
/// When `unannotated_path` is given, clause texts without a parse are written
/// there one per line so they can be annotated before a re-run.
pub fn run_extractor(
    input: &Path,
    output: &Path,
    parser: &dyn DependencyParser,
    config: &ExtractorConfig,
    output_config: &OutputConfig,
    unannotated_path: Option<&Path>,
) -> Result<ExtractionReport, PipelineError> {
    let table = read_table(input)?;
    let extractor = CritiqueExtractor::new(parser);
    let (extracted, report) = extractor.extract_table(&table, config)?;
    write_table(output, &extracted, output_config.write_bom)?;
    let coverage = &report.coverage;
    info!(
        "[uicrit:extract] {} comments, {} complete triples ({:.1}%), unknown problem/verb/obj = {}/{}/{} -> {}",
        coverage.total,
        coverage.valid,
        coverage.valid_share * 100.0,
        coverage.unknown_problem,
        coverage.unknown_verb,
        coverage.unknown_obj,
        output.display()
    );
    if !report.unannotated.is_empty() {
        warn!(
            "[uicrit:extract] {} clause texts had no annotation",
            report.unannotated.len()
        );
        if let Some(path) = unannotated_path {
            write_lines(path, &report.unannotated)?;
            info!(
                "[uicrit:extract] texts awaiting annotation written to {}",
                path.display()
            );
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::AnnotationStore;
    use crate::nlp::doc::token;

    fn store() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.insert(
            "The back button is not visually prominent.",
            Doc::new(vec![
                token("The", "the", PosTag::Det, "det", Some(2)),
                token("back", "back", PosTag::Adj, "amod", Some(2)),
                token("button", "button", PosTag::Noun, "nsubj", Some(3)),
                token("is", "be", PosTag::Aux, "ROOT", None),
                token("not", "not", PosTag::Part, "neg", Some(3)),
                token("visually", "visually", PosTag::Adv, "advmod", Some(6)),
                token("prominent", "prominent", PosTag::Adj, "acomp", Some(3)),
                token(".", ".", PosTag::Punct, "punct", Some(3)),
            ]),
        );
        store.insert(
            "We can enlarge the back button.",
            Doc::new(vec![
                token("We", "we", PosTag::Pron, "nsubj", Some(2)),
                token("can", "can", PosTag::Aux, "aux", Some(2)),
                token("enlarge", "enlarge", PosTag::Verb, "ROOT", None),
                token("the", "the", PosTag::Det, "det", Some(5)),
                token("back", "back", PosTag::Adj, "amod", Some(5)),
                token("button", "button", PosTag::Noun, "dobj", Some(2)),
                token(".", ".", PosTag::Punct, "punct", Some(2)),
            ]),
        );
        store.insert(
            "The color of the labels is dull.",
            Doc::new(vec![
                token("The", "the", PosTag::Det, "det", Some(1)),
                token("color", "color", PosTag::Noun, "nsubj", Some(5)),
                token("of", "of", PosTag::Adp, "prep", Some(1)),
                token("the", "the", PosTag::Det, "det", Some(4)),
                token("labels", "label", PosTag::Noun, "pobj", Some(2)),
                token("is", "be", PosTag::Aux, "ROOT", None),
                token("dull", "dull", PosTag::Adj, "acomp", Some(5)),
                token(".", ".", PosTag::Punct, "punct", Some(5)),
            ]),
        );
        store.insert(
            "The button should be enlarged.",
            Doc::new(vec![
                token("The", "the", PosTag::Det, "det", Some(1)),
                token("button", "button", PosTag::Noun, "nsubjpass", Some(4)),
                token("should", "should", PosTag::Aux, "aux", Some(4)),
                token("be", "be", PosTag::Aux, "auxpass", Some(4)),
                token("enlarged", "enlarge", PosTag::Verb, "ROOT", None),
                token(".", ".", PosTag::Punct, "punct", Some(4)),
            ]),
        );
        store.insert(
            "Try to increase the contrast.",
            Doc::new(vec![
                token("Try", "try", PosTag::Verb, "ROOT", None),
                token("to", "to", PosTag::Part, "aux", Some(2)),
                token("increase", "increase", PosTag::Verb, "xcomp", Some(0)),
                token("the", "the", PosTag::Det, "det", Some(4)),
                token("contrast", "contrast", PosTag::Noun, "dobj", Some(2)),
                token(".", ".", PosTag::Punct, "punct", Some(0)),
            ]),
        );
        store.insert(
            "Focus on the header.",
            Doc::new(vec![
                token("Focus", "focus", PosTag::Verb, "ROOT", None),
                token("on", "on", PosTag::Adp, "prep", Some(0)),
                token("the", "the", PosTag::Det, "det", Some(3)),
                token("header", "header", PosTag::Noun, "pobj", Some(1)),
                token(".", ".", PosTag::Punct, "punct", Some(0)),
            ]),
        );
        store.insert("The header should be a banner.", banner_clause());
        store
    }

    fn banner_clause() -> Doc {
        Doc::new(vec![
            token("The", "the", PosTag::Det, "det", Some(1)),
            token("header", "header", PosTag::Noun, "nsubj", Some(3)),
            token("should", "should", PosTag::Aux, "aux", Some(3)),
            token("be", "be", PosTag::Aux, "ROOT", None),
            token("a", "a", PosTag::Det, "det", Some(5)),
            token("banner", "banner", PosTag::Noun, "attr", Some(3)),
            token(".", ".", PosTag::Punct, "punct", Some(3)),
        ])
    }

    fn triple(problem: &str, verb: &str, obj: &str) -> CritiqueTriple {
        CritiqueTriple {
            problem: problem.into(),
            solution_verb: verb.into(),
            solution_obj: obj.into(),
        }
    }

    #[test]
    fn back_button_critique() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let text = "In the current design, the back button is not visually prominent. \
                    To fix this, we can enlarge the back button.";
        assert_eq!(
            extractor.extract(text),
            triple("back button", "enlarge", "back button")
        );
    }

    #[test]
    fn asides_are_removed_before_matching() {
        assert_eq!(
            strip_asides("Tap (the icon) \"here\" [0.1, 0.2]"),
            "Tap here"
        );
        let (problem, solution) = split_template(
            "in the current design the back button (top left) is not visually prominent. to fix this, we can enlarge the back button.",
        )
        .unwrap();
        assert_eq!(problem, "The back button is not visually prominent.");
        assert_eq!(solution, "We can enlarge the back button.");
    }

    #[test]
    fn text_without_anchor_is_all_unknown() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        assert_eq!(
            extractor.extract("In the current design, the back button is not visually prominent."),
            CritiqueTriple::unknown()
        );
        assert_eq!(extractor.extract("   "), CritiqueTriple::unknown());
    }

    #[test]
    fn subject_is_cut_at_first_preposition() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let text = "In the current design, the color of the labels is dull. To fix this, focus on the header.";
        assert_eq!(extractor.extract(text), triple("color", "focus", "header"));
    }

    #[test]
    fn passive_fix_uses_subject_as_object() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let text = "In the current design, the back button is not visually prominent. To fix this, the button should be enlarged.";
        assert_eq!(
            extractor.extract(text),
            triple("back button", "enlarge", "button")
        );
    }

    #[test]
    fn xcomp_object_is_used_with_root_verb() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let text = "In the current design, the color of the labels is dull. To fix this, try to increase the contrast.";
        assert_eq!(extractor.extract(text), triple("color", "try", "contrast"));
    }

    #[test]
    fn direct_object_wins_over_prepositional_object() {
        // "Move the button to the top"
        let doc = Doc::new(vec![
            token("Move", "move", PosTag::Verb, "ROOT", None),
            token("the", "the", PosTag::Det, "det", Some(2)),
            token("button", "button", PosTag::Noun, "dobj", Some(0)),
            token("to", "to", PosTag::Adp, "prep", Some(0)),
            token("the", "the", PosTag::Det, "det", Some(5)),
            token("top", "top", PosTag::Noun, "pobj", Some(3)),
        ]);
        let parts = analyze_clause(&doc);
        assert_eq!(parts.verb.as_deref(), Some("move"));
        assert_eq!(parts.object.as_deref(), Some("button"));
    }

    #[test]
    fn xcomp_object_wins_over_root_preposition() {
        // "Try to enlarge the icon on the page", with "on" attached to "Try"
        let doc = Doc::new(vec![
            token("Try", "try", PosTag::Verb, "ROOT", None),
            token("to", "to", PosTag::Part, "aux", Some(2)),
            token("enlarge", "enlarge", PosTag::Verb, "xcomp", Some(0)),
            token("the", "the", PosTag::Det, "det", Some(4)),
            token("icon", "icon", PosTag::Noun, "dobj", Some(2)),
            token("on", "on", PosTag::Adp, "prep", Some(0)),
            token("the", "the", PosTag::Det, "det", Some(7)),
            token("page", "page", PosTag::Noun, "pobj", Some(5)),
        ]);
        let parts = analyze_clause(&doc);
        assert_eq!(parts.verb.as_deref(), Some("try"));
        assert_eq!(parts.object.as_deref(), Some("icon"));
    }

    #[test]
    fn attribute_counts_as_direct_object() {
        let parts = analyze_clause(&banner_clause());
        assert_eq!(parts.verb.as_deref(), Some("be"));
        assert_eq!(parts.subject.as_deref(), Some("header"));
        assert_eq!(parts.object.as_deref(), Some("banner"));

        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let text = "In the current design, the back button is not visually prominent. To fix this, the header should be a banner.";
        assert_eq!(extractor.extract(text), triple("back button", "be", "banner"));
    }

    #[test]
    fn cyclic_clause_still_returns() {
        let doc = Doc::new(vec![
            token("Enlarge", "enlarge", PosTag::Verb, "ROOT", Some(1)),
            token("button", "button", PosTag::Noun, "dobj", Some(0)),
        ]);
        let parts = analyze_clause(&doc);
        assert_eq!(parts.verb.as_deref(), Some("enlarge"));
        assert_eq!(parts.object.as_deref(), Some("enlarge button"));
    }

    #[test]
    fn unannotated_clause_only_affects_its_fields() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let mut pending = IndexSet::new();
        let text = "In the current design, the back button is not visually prominent. To fix this, do something else.";
        let result = extractor.extract_tracked(text, &mut pending);
        assert_eq!(result, triple("back button", UNKNOWN, UNKNOWN));
        assert!(pending.contains("Do something else."));
    }

    #[test]
    fn extraction_is_deterministic() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let text = "In the current design, the back button is not visually prominent. To fix this, we can enlarge the back button.";
        assert_eq!(extractor.extract(text), extractor.extract(text));
    }

    #[test]
    fn table_pass_replaces_slot_columns_with_triples() {
        let store = store();
        let extractor = CritiqueExtractor::new(&store);
        let mut input = Table::new(["id", "comment1_type", "comment1_text"]);
        input.push_row(vec![
            "1".into(),
            "human".into(),
            "In the current design, the back button is not visually prominent. To fix this, we can enlarge the back button.".into(),
        ]);
        input.push_row(vec!["2".into(), String::new(), String::new()]);
        let config = ExtractorConfig {
            max_comments: 2,
            ..ExtractorConfig::default()
        };
        let (output, report) = extractor.extract_table(&input, &config).unwrap();
        assert_eq!(
            output.headers(),
            [
                "id",
                "comment1_problem",
                "comment1_solution_verb",
                "comment1_solution_obj"
            ]
        );
        assert_eq!(output.cell(0, 2), "enlarge");
        assert_eq!(output.cell(1, 1), UNKNOWN);
        assert_eq!(report.skipped_columns, vec!["comment2_text"]);
        assert_eq!(report.coverage.total, 1);
        assert_eq!(report.coverage.valid, 1);
    }
}
