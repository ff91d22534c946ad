use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::config::OutputConfig;
use crate::constants::columns::{self, SLOT_TRIPLE_PATTERN};
use crate::data::{CritiqueTriple, RecordId};
use crate::errors::PipelineError;
use crate::table::Table;
use crate::transport::{read_table, write_table};

static SLOT_TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SLOT_TRIPLE_PATTERN).expect("slot triple pattern compiles"));

/// Row counts before and after dropping incomplete triples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlattenReport {
    /// Long rows before incomplete triples were dropped.
    pub before: usize,
    /// Long rows written.
    pub after: usize,
}

#[derive(Default)]
struct SlotColumns {
    problem: Option<usize>,
    verb: Option<usize>,
    obj: Option<usize>,
}

/// Long table `id, comment_problem, comment_verb, comment_obj`, ordered by
/// id then comment number; triples with any unknown or empty field are dropped.
pub fn to_long(table: &Table) -> Result<(Table, FlattenReport), PipelineError> {
    let id_col = table.require_column(columns::ID, "flattener input")?;
    let mut slots: BTreeMap<usize, SlotColumns> = BTreeMap::new();
    for (idx, name) in table.headers().iter().enumerate() {
        let Some(captures) = SLOT_TRIPLE.captures(name) else {
            continue;
        };
        let Ok(slot) = captures[1].parse::<usize>() else {
            continue;
        };
        let entry = slots.entry(slot).or_default();
        match &captures[2] {
            "problem" => entry.problem = Some(idx),
            "verb" => entry.verb = Some(idx),
            _ => entry.obj = Some(idx),
        }
    }
    for (slot, found) in &slots {
        let missing = [
            (found.problem, columns::slot_problem(*slot)),
            (found.verb, columns::slot_solution_verb(*slot)),
            (found.obj, columns::slot_solution_obj(*slot)),
        ];
        if let Some((_, name)) = missing.into_iter().find(|(column, _)| column.is_none()) {
            return Err(PipelineError::SchemaMismatch {
                column: name,
                context: "flattener input".to_string(),
            });
        }
    }

    let mut rows: Vec<(RecordId, usize, CritiqueTriple)> = Vec::new();
    for row in 0..table.len() {
        let raw_id = table.cell(row, id_col).trim();
        let id: RecordId = raw_id.parse().map_err(|_| PipelineError::InvalidValue {
            column: columns::ID.to_string(),
            row,
            value: raw_id.to_string(),
        })?;
        for (slot, found) in &slots {
            let cell = |column: Option<usize>| {
                column
                    .map(|column| table.cell(row, column).to_string())
                    .unwrap_or_default()
            };
            rows.push((
                id,
                *slot,
                CritiqueTriple {
                    problem: cell(found.problem),
                    solution_verb: cell(found.verb),
                    solution_obj: cell(found.obj),
                },
            ));
        }
    }
    rows.sort_by_key(|(id, slot, _)| (*id, *slot));

    let mut long = Table::new([
        columns::ID,
        columns::LONG_PROBLEM,
        columns::LONG_VERB,
        columns::LONG_OBJ,
    ]);
    let before = rows.len();
    for (id, _, triple) in rows.into_iter().filter(|(_, _, triple)| triple.is_valid()) {
        long.push_row(vec![
            id.to_string(),
            triple.problem,
            triple.solution_verb,
            triple.solution_obj,
        ]);
    }
    let report = FlattenReport {
        before,
        after: long.len(),
    };
    Ok((long, report))
}

/// Read a wide triple table from `input` and write its long form to `output`.
pub fn run_flatten(
    input: &Path,
    output: &Path,
    output_config: &OutputConfig,
) -> Result<FlattenReport, PipelineError> {
    let table = read_table(input)?;
    let (long, report) = to_long(&table)?;
    write_table(output, &long, output_config.write_bom)?;
    info!(
        "[uicrit:flatten] {} comment rows, {} after dropping incomplete triples -> {}",
        report.before,
        report.after,
        output.display()
    );
    Ok(report)
}
