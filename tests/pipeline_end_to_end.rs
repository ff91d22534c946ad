use std::fs;
use std::path::Path;

use tempfile::tempdir;
use uicrit::config::{ExtractorConfig, ModelConfig, OutputConfig, PipelineConfig};
use uicrit::extract::run_extractor;
use uicrit::flatten::run_flatten;
use uicrit::normalize::run_normalizer;
use uicrit::segment::run_segmenter;
use uicrit::transport::read_table;
use uicrit::{AnnotationStore, LanguageModel, Table};

type Row<'a> = (&'a str, &'a str, &'a str, usize, &'a str);

fn sentence(text: &str, rows: &[Row<'_>]) -> String {
    let mut block = format!("# text = {text}\n");
    for (idx, (form, lemma, upos, head, deprel)) in rows.iter().enumerate() {
        block.push_str(&format!(
            "{}\t{form}\t{lemma}\t{upos}\t_\t_\t{head}\t{deprel}\t_\t_\n",
            idx + 1
        ));
    }
    block.push('\n');
    block
}

const BOUNDING_BOX: [Row<'static>; 3] = [
    ("bounding", "bounding", "NOUN", 2, "compound"),
    ("box", "box", "NOUN", 0, "ROOT"),
    (":", ":", "PUNCT", 2, "punct"),
];

fn annotations() -> String {
    let mut conllu = String::new();
    conllu.push_str("# newdoc\n");
    conllu.push_str(&sentence(
        "The back button is not visually prominent.",
        &[
            ("The", "the", "DET", 3, "det"),
            ("back", "back", "ADJ", 3, "amod"),
            ("button", "button", "NOUN", 4, "nsubj"),
            ("is", "be", "AUX", 0, "ROOT"),
            ("not", "not", "PART", 4, "neg"),
            ("visually", "visually", "ADV", 7, "advmod"),
            ("prominent", "prominent", "ADJ", 4, "acomp"),
            (".", ".", "PUNCT", 4, "punct"),
        ],
    ));
    conllu.push_str("# newdoc\n");
    conllu.push_str(&sentence(
        "We can enlarge the back button.",
        &[
            ("We", "we", "PRON", 3, "nsubj"),
            ("can", "can", "AUX", 3, "aux"),
            ("enlarge", "enlarge", "VERB", 0, "ROOT"),
            ("the", "the", "DET", 6, "det"),
            ("back", "back", "ADJ", 6, "amod"),
            ("button", "button", "NOUN", 3, "dobj"),
            (".", ".", "PUNCT", 3, "punct"),
        ],
    ));
    conllu.push_str(&sentence("bounding box:", &BOUNDING_BOX));
    conllu.push_str("# newdoc\n");
    conllu.push_str(&sentence(
        "The color of the labels is dull.",
        &[
            ("The", "the", "DET", 2, "det"),
            ("color", "color", "NOUN", 6, "nsubj"),
            ("of", "of", "ADP", 2, "prep"),
            ("the", "the", "DET", 5, "det"),
            ("labels", "label", "NOUN", 3, "pobj"),
            ("is", "be", "AUX", 0, "ROOT"),
            ("dull", "dull", "ADJ", 6, "acomp"),
            (".", ".", "PUNCT", 6, "punct"),
        ],
    ));
    conllu.push_str("# newdoc\n");
    conllu.push_str(&sentence(
        "Try to increase the contrast.",
        &[
            ("Try", "try", "VERB", 0, "ROOT"),
            ("to", "to", "PART", 3, "aux"),
            ("increase", "increase", "VERB", 1, "xcomp"),
            ("the", "the", "DET", 5, "det"),
            ("contrast", "contrast", "NOUN", 3, "dobj"),
            (".", ".", "PUNCT", 1, "punct"),
        ],
    ));
    conllu.push_str(&sentence("bounding box:", &BOUNDING_BOX));
    conllu.push_str("# newdoc\n");
    conllu.push_str(&sentence(
        "The text is small.",
        &[
            ("The", "the", "DET", 2, "det"),
            ("text", "text", "NOUN", 3, "nsubj"),
            ("is", "be", "AUX", 0, "ROOT"),
            ("small", "small", "ADJ", 3, "acomp"),
            (".", ".", "PUNCT", 3, "punct"),
        ],
    ));
    conllu.push_str("# newdoc\n");
    conllu.push_str(&sentence(
        "Enlarge the font.",
        &[
            ("Enlarge", "enlarge", "VERB", 0, "ROOT"),
            ("the", "the", "DET", 3, "det"),
            ("font", "font", "NOUN", 1, "dobj"),
            (".", ".", "PUNCT", 1, "punct"),
        ],
    ));
    conllu.push_str(&sentence("bounding box:", &BOUNDING_BOX));
    conllu
}

const VECTORS: &str = "\
6 4
text 1 0 0 0
font 0.98 0.05 0 0
color 0 1 0 0
contrast 0 0 1 0
enlarge 0 0 0 1
button -1 0 0 0
";

const EXPORT: &str = concat!(
    "id,comments\n",
    "1,\"['Comment 1\\nIn the current design, the back button is not visually prominent. ",
    "To fix this, we can enlarge the back button. Bounding Box: [0.1, 0.2, 0.3, 0.4]', ",
    "'LLM Comment 2\\nIn the current design, the color of the labels is dull. ",
    "To fix this, try to increase the contrast. Bounding Box: [0.5, 0.6]']\"\n",
    "2,\"['Comment 1\\nIn the current design, the text is small. ",
    "To fix this, enlarge the font. Bounding Box: [0.2, 0.2]']\"\n",
    "3,\"['Comment 1\\nThe layout looks fine. Bounding Box: [0.9]', ",
    "'Comment 2\\nIn the current design, the menu is hidden. ",
    "To fix this, show the menu. Bounding Box: [1.0]']\"\n",
);

fn column<'a>(table: &'a Table, name: &str) -> Vec<&'a str> {
    let idx = table.column_index(name).unwrap();
    table.column(idx).collect()
}

fn write(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
}

#[test]
fn export_flows_through_every_stage() {
    let dir = tempdir().unwrap();
    let export = dir.path().join("export.csv");
    let conllu = dir.path().join("comments.conllu");
    let vectors = dir.path().join("vectors.txt");
    write(&export, EXPORT);
    write(&conllu, &annotations());
    write(&vectors, VECTORS);

    let config = PipelineConfig {
        model: ModelConfig {
            annotations: vec![conllu],
            vectors: Some(vectors),
            extra_stop_words: Vec::new(),
        },
        ..PipelineConfig::default()
    };
    let model = LanguageModel::load(&config.model).unwrap();

    let segmented = dir.path().join("stages/segmented.csv");
    let report = run_segmenter(&export, &segmented, &config.segment, &config.output).unwrap();
    assert_eq!((report.records, report.slots, report.llm_slots), (3, 5, 1));
    let table = read_table(&segmented).unwrap();
    assert_eq!(column(&table, "comment2_type"), ["llm", "", "human"]);
    assert_eq!(column(&table, "comment1_text")[2], "The layout looks fine. Bounding Box: [0.9]");

    let triples = dir.path().join("stages/triples.csv");
    let unannotated = dir.path().join("stages/unannotated.txt");
    let report = run_extractor(
        &segmented,
        &triples,
        model.parser(),
        &config.extract,
        &config.output,
        Some(&unannotated),
    )
    .unwrap();
    assert_eq!((report.coverage.total, report.coverage.valid), (5, 3));
    assert_eq!(
        fs::read_to_string(&unannotated).unwrap(),
        "The menu is hidden.\nShow the menu. bounding box:\n"
    );
    let table = read_table(&triples).unwrap();
    assert!(table.column_index("comment1_text").is_none());
    assert_eq!(column(&table, "comment1_problem"), ["back button", "text", "unknown"]);
    assert_eq!(column(&table, "comment1_solution_verb"), ["enlarge", "enlarge", "unknown"]);
    assert_eq!(column(&table, "comment1_solution_obj"), ["back button", "font", "unknown"]);
    assert_eq!(column(&table, "comment2_solution_verb"), ["try", "unknown", "unknown"]);
    assert_eq!(column(&table, "comment2_solution_obj"), ["contrast", "unknown", "unknown"]);

    let normalized = dir.path().join("stages/normalized.csv");
    let report =
        run_normalizer(&triples, &normalized, &model, &config.cluster, &config.output).unwrap();
    assert_eq!(report.cells_rewritten, 1);
    let table = read_table(&normalized).unwrap();
    assert_eq!(column(&table, "comment1_solution_obj"), ["back button", "text", "unknown"]);
    assert_eq!(column(&table, "comment2_solution_verb"), ["try", "unknown", "unknown"]);

    let long = dir.path().join("long.csv");
    let report = run_flatten(&normalized, &long, &OutputConfig::default()).unwrap();
    assert_eq!((report.before, report.after), (21, 3));
    assert_eq!(
        fs::read_to_string(&long).unwrap(),
        "id,comment_problem,comment_verb,comment_obj\n\
         1,back button,enlarge,back button\n\
         1,color,try,contrast\n\
         2,text,enlarge,text\n"
    );
}

#[test]
fn extraction_is_deterministic_across_runs() {
    let dir = tempdir().unwrap();
    let export = dir.path().join("export.csv");
    write(&export, EXPORT);
    let parser = AnnotationStore::from_conllu_str(&annotations(), "inline").unwrap();
    let segmented = dir.path().join("segmented.csv");
    let config = PipelineConfig::default();
    run_segmenter(&export, &segmented, &config.segment, &config.output).unwrap();

    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    for output in [&first, &second] {
        run_extractor(
            &segmented,
            output,
            &parser,
            &ExtractorConfig::default(),
            &OutputConfig::default(),
            None,
        )
        .unwrap();
    }
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn missing_input_leaves_no_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("segmented.csv");
    let config = PipelineConfig::default();
    let err = run_segmenter(
        &dir.path().join("absent.csv"),
        &output,
        &config.segment,
        &config.output,
    )
    .unwrap_err();
    assert!(matches!(err, uicrit::PipelineError::MissingInputFile { .. }));
    assert!(!output.exists());
}
