use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::config::{OutputConfig, SegmenterConfig};
use crate::constants::columns;
use crate::constants::segment::{COMMENT_BLOCK_PATTERN, ESCAPED_NEWLINE, LLM_HEADER_PREFIX};
use crate::data::{CommentSlot, CommentType, Record, RecordId};
use crate::errors::PipelineError;
use crate::table::Table;
use crate::transport::{read_table, write_table};
use crate::utils::strip_quotes;

static COMMENT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COMMENT_BLOCK_PATTERN).expect("comment block pattern compiles"));

/// Totals from one segmenter run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentReport {
    /// Records written to the wide table.
    pub records: usize,
    /// Comment slots filled across all records.
    pub slots: usize,
    /// Slots typed `llm`.
    pub llm_slots: usize,
    /// Input rows dropped for an unparseable id.
    pub skipped_rows: usize,
    /// Records whose blob held no recognisable comment block.
    pub empty_records: usize,
    /// Blocks beyond the slot limit that were discarded.
    pub truncated_blocks: usize,
}

/// Split one raw blob into at most `max_comments` slots, in order of appearance.
pub fn segment_comments(raw: &str, max_comments: usize) -> Vec<CommentSlot> {
    COMMENT_BLOCK
        .find_iter(raw)
        .take(max_comments)
        .map(|block| split_block(block.as_str()))
        .collect()
}

fn split_block(block: &str) -> CommentSlot {
    let cleaned = strip_quotes(block);
    let (header, body) = match cleaned.split_once(ESCAPED_NEWLINE) {
        Some(parts) => parts,
        None => cleaned.split_once('\n').unwrap_or((cleaned, "")),
    };
    let kind = if header.trim().starts_with(LLM_HEADER_PREFIX) {
        CommentType::Llm
    } else {
        CommentType::Human
    };
    CommentSlot {
        kind,
        text: strip_quotes(body).to_string(),
    }
}

/// Wide output header: `id`, then `comment{i}_type` / `comment{i}_text` pairs.
pub fn segmented_headers(max_comments: usize) -> Vec<String> {
    let mut headers = vec![columns::ID.to_string()];
    for slot in 1..=max_comments {
        headers.push(columns::slot_type(slot));
        headers.push(columns::slot_text(slot));
    }
    headers
}

/// Read the typed records out of an input table.
///
/// Rows whose id is not a non-negative integer are logged and skipped.
pub fn records_from_table(
    table: &Table,
    config: &SegmenterConfig,
) -> Result<Vec<Record>, PipelineError> {
    let context = "segmenter input";
    let id_col = table.require_column(&config.id_column, context)?;
    let comments_col = table.require_column(&config.comments_column, context)?;
    let records = (0..table.len())
        .filter_map(|row| {
            let raw_id = table.cell(row, id_col).trim();
            match raw_id.parse::<RecordId>() {
                Ok(id) => Some(Record {
                    id,
                    comments: table.cell(row, comments_col).to_string(),
                }),
                Err(_) => {
                    warn!(
                        "[uicrit:segment] skipping row {row}: invalid {} {raw_id:?}",
                        config.id_column
                    );
                    None
                }
            }
        })
        .collect();
    Ok(records)
}

/// Segment every record into the wide slot table.
pub fn segment_table(
    table: &Table,
    config: &SegmenterConfig,
) -> Result<(Table, SegmentReport), PipelineError> {
    let records = records_from_table(table, config)?;
    let mut output = Table::new(segmented_headers(config.max_comments));
    let mut report = SegmentReport {
        skipped_rows: table.len() - records.len(),
        ..SegmentReport::default()
    };
    for record in &records {
        let found = COMMENT_BLOCK.find_iter(&record.comments).count();
        let slots = segment_comments(&record.comments, config.max_comments);
        report.records += 1;
        report.slots += slots.len();
        report.llm_slots += slots
            .iter()
            .filter(|slot| slot.kind == CommentType::Llm)
            .count();
        report.truncated_blocks += found.saturating_sub(slots.len());
        if slots.is_empty() {
            report.empty_records += 1;
        }
        let mut row = vec![record.id.to_string()];
        for slot in slots {
            row.push(slot.kind.to_string());
            row.push(slot.text);
        }
        output.push_row(row);
    }
    Ok((output, report))
}

/// Read `input`, segment it and write the wide table to `output`.
pub fn run_segmenter(
    input: &Path,
    output: &Path,
    config: &SegmenterConfig,
    output_config: &OutputConfig,
) -> Result<SegmentReport, PipelineError> {
    let table = read_table(input)?;
    let (segmented, report) = segment_table(&table, config)?;
    if report.skipped_rows > 0 {
        warn!(
            "[uicrit:segment] skipped {} rows with an invalid {}",
            report.skipped_rows, config.id_column
        );
    }
    if report.empty_records > 0 {
        warn!(
            "[uicrit:segment] {} of {} records held no comment block",
            report.empty_records, report.records
        );
    }
    write_table(output, &segmented, output_config.write_bom)?;
    info!(
        "[uicrit:segment] {} records -> {} slots ({} llm, {} dropped past limit) -> {}",
        report.records,
        report.slots,
        report.llm_slots,
        report.truncated_blocks,
        output.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(header: &str, body: &str) -> String {
        format!("'{header}\\n{body}\\nBounding Box: [0.1, 0.2, 0.3, 0.4]'")
    }

    #[test]
    fn blocks_are_typed_by_header_prefix() {
        let raw = format!(
            "[{}, {}]",
            block("Comment 1", "In the current design, the text is small."),
            block("LLM Comment 2", "Add a label.")
        );
        let slots = segment_comments(&raw, 7);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].kind, CommentType::Human);
        assert!(slots[0].text.starts_with("In the current design"));
        assert!(slots[0].text.ends_with("Bounding Box: [0.1, 0.2, 0.3, 0.4]"));
        assert_eq!(slots[1].kind, CommentType::Llm);
    }

    #[test]
    fn at_most_max_comments_are_kept() {
        let raw: Vec<String> = (1..=9)
            .map(|i| block(&format!("Comment {i}"), "text"))
            .collect();
        let slots = segment_comments(&raw.join(", "), 7);
        assert_eq!(slots.len(), 7);
    }

    #[test]
    fn real_newline_is_the_fallback_separator() {
        let slots = segment_comments("Comment 1\nBody here Bounding Box: [1]", 7);
        assert_eq!(slots[0].text, "Body here Bounding Box: [1]");
    }

    #[test]
    fn header_without_separator_gives_empty_body() {
        let slots = segment_comments("LLM Comment 1 Bounding Box: [1]", 7);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].kind, CommentType::Llm);
        assert_eq!(slots[0].text, "");
    }

    #[test]
    fn lowercase_llm_is_human() {
        let slots = segment_comments("llm Comment 1\\nx Bounding Box: [1]", 7);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].kind, CommentType::Human);
        assert_eq!(slots[0].text, "x Bounding Box: [1]");
    }

    #[test]
    fn table_has_fixed_width_and_empty_missing_slots() {
        let mut input = Table::new(["id", "comments"]);
        input.push_row(vec!["3".into(), block("LLM Comment 1", "Body")]);
        input.push_row(vec!["4".into(), "no comments here".into()]);
        let (table, report) = segment_table(&input, &SegmenterConfig::default()).unwrap();
        assert_eq!(table.headers().len(), 15);
        assert_eq!(table.headers()[1], "comment1_type");
        assert_eq!(table.cell(0, 1), "llm");
        assert!(table.cell(0, 2).starts_with("Body"));
        assert_eq!(table.cell(0, 3), "");
        assert!(table.rows()[1][1..].iter().all(String::is_empty));
        assert_eq!(report.empty_records, 1);
        assert_eq!(report.llm_slots, 1);
    }

    #[test]
    fn missing_comments_column_is_a_schema_error() {
        let input = Table::new(["id"]);
        let err = segment_table(&input, &SegmenterConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref column, .. } if column == "comments"));
    }

    #[test]
    fn non_numeric_id_row_is_skipped() {
        let mut input = Table::new(["id", "comments"]);
        input.push_row(vec!["abc".into(), format!("[{}]", block("Comment 1", "Ignored."))]);
        input.push_row(vec!["-3".into(), String::new()]);
        input.push_row(vec![
            " 7 ".into(),
            format!("[{}]", block("Comment 1", "Add a label.")),
        ]);
        let (table, report) = segment_table(&input, &SegmenterConfig::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, 0), "7");
        assert_eq!(table.cell(0, 1), "human");
        assert_eq!((report.records, report.skipped_rows), (1, 2));
    }
}
