use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::cluster::Dendrogram;
use crate::config::{ClusterConfig, ClusterScope, OutputConfig};
use crate::constants::cluster::LOGGED_CLUSTER_PREVIEW;
use crate::data::{Phrase, PhraseCluster, is_known};
use crate::errors::PipelineError;
use crate::metrics::{ClusterSummary, cluster_summary};
use crate::nlp::LanguageModel;
use crate::table::Table;
use crate::transport::{read_table, write_table};
use crate::utils::clean_phrase;

/// Immutable phrase → representative lookup.
///
/// Every phrase seen while building maps to its representative (possibly
/// itself), and every representative maps to itself, so applying the map
/// twice is the same as applying it once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizationMap {
    map: HashMap<Phrase, Phrase>,
}

impl NormalizationMap {
    /// Canonical form of `value`: its representative when known, else the cleaned value.
    pub fn apply(&self, value: &str) -> String {
        if let Some(representative) = self.map.get(value) {
            return representative.clone();
        }
        let cleaned = clean_phrase(value);
        match self.map.get(&cleaned) {
            Some(representative) => representative.clone(),
            None => cleaned,
        }
    }

    /// Representative of an already-cleaned phrase.
    pub fn representative(&self, phrase: &str) -> Option<&str> {
        self.map.get(phrase).map(String::as_str)
    }

    /// Number of mapped phrases.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Phrases with their occurrence counts, in first-encountered order.
pub type PhraseCounts = IndexMap<Phrase, usize>;

/// Count cleaned, known values of `columns`, column by column, top to bottom.
pub fn collect_phrases(table: &Table, columns: &[usize]) -> PhraseCounts {
    let mut counts = PhraseCounts::new();
    for &column in columns {
        for value in table.column(column) {
            let cleaned = clean_phrase(value);
            if is_known(&cleaned) {
                *counts.entry(cleaned).or_default() += 1;
            }
        }
    }
    counts
}

/// Result of clustering one phrase space.
#[derive(Clone, Debug, Default)]
pub struct PhraseClustering {
    /// Phrase to representative, for every collected phrase.
    pub map: NormalizationMap,
    /// Clusters of embeddable phrases, in label order.
    pub clusters: Vec<PhraseCluster>,
    /// Phrases with no embeddable token; each maps to itself.
    pub unembeddable: Vec<Phrase>,
}

/// Embed, cluster and pick a representative for every phrase in `counts`.
///
/// The representative is the member with the highest count; ties go to the
/// member encountered first.
pub fn cluster_phrases(
    model: &LanguageModel,
    counts: &PhraseCounts,
    distance_threshold: f64,
) -> PhraseClustering {
    let mut embedded: Vec<(&Phrase, Vec<f32>)> = Vec::new();
    let mut unembeddable = Vec::new();
    for phrase in counts.keys() {
        match model.embed(phrase) {
            Some(vector) => embedded.push((phrase, vector)),
            None => unembeddable.push(phrase.clone()),
        }
    }

    let vectors: Vec<&[f32]> = embedded.iter().map(|(_, vector)| vector.as_slice()).collect();
    let labels = Dendrogram::average_linkage(&vectors).cut(distance_threshold);

    let mut grouped: Vec<Vec<&Phrase>> = Vec::new();
    for ((phrase, _), label) in embedded.iter().zip(&labels) {
        if *label == grouped.len() {
            grouped.push(Vec::new());
        }
        grouped[*label].push(*phrase);
    }

    let mut map = HashMap::with_capacity(counts.len());
    let mut clusters = Vec::with_capacity(grouped.len());
    for members in grouped {
        let mut representative = members[0];
        for member in &members[1..] {
            if counts[*member] > counts[representative] {
                representative = *member;
            }
        }
        for member in &members {
            map.insert((*member).clone(), representative.clone());
        }
        clusters.push(PhraseCluster {
            members: members.into_iter().cloned().collect(),
            representative: representative.clone(),
        });
    }
    for phrase in &unembeddable {
        map.insert(phrase.clone(), phrase.clone());
    }

    PhraseClustering {
        map: NormalizationMap { map },
        clusters,
        unembeddable,
    }
}

/// Outcome of a normalizer table pass.
#[derive(Clone, Debug, Default)]
pub struct NormalizeReport {
    /// Distinct phrases across all groups.
    pub phrases: usize,
    /// Phrases with at least one embeddable token.
    pub embeddable: usize,
    /// `None` when nothing could be clustered.
    pub summary: Option<ClusterSummary>,
    /// Target cells whose value changed.
    pub cells_rewritten: usize,
}

/// Columns whose names end with one of `suffixes`.
pub fn target_columns(table: &Table, suffixes: &[String]) -> Vec<usize> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, name)| suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())))
        .map(|(idx, _)| idx)
        .collect()
}

fn column_groups(table: &Table, config: &ClusterConfig, targets: &[usize]) -> Vec<Vec<usize>> {
    match config.scope {
        ClusterScope::Pooled => vec![targets.to_vec()],
        ClusterScope::PerField => {
            let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
            for &column in targets {
                let name = &table.headers()[column];
                if let Some(suffix) = config
                    .target_suffixes
                    .iter()
                    .find(|suffix| name.ends_with(suffix.as_str()))
                {
                    groups.entry(suffix.as_str()).or_default().push(column);
                }
            }
            groups.into_values().collect()
        }
    }
}

/// Cluster the target columns of `table` and rewrite them through the resulting maps.
pub fn normalize_table(
    model: &LanguageModel,
    table: &Table,
    config: &ClusterConfig,
) -> Result<(Table, NormalizeReport), PipelineError> {
    config.validate()?;
    let targets = target_columns(table, &config.target_suffixes);
    if targets.is_empty() {
        return Err(PipelineError::SchemaMismatch {
            column: format!("*{}", config.target_suffixes.join(" | *")),
            context: "normalizer input".to_string(),
        });
    }

    let mut output = table.clone();
    let mut report = NormalizeReport::default();
    let mut all_clusters = Vec::new();
    for group in column_groups(table, config, &targets) {
        let counts = collect_phrases(table, &group);
        let clustering = cluster_phrases(model, &counts, config.distance_threshold);
        report.phrases += counts.len();
        report.embeddable += counts.len() - clustering.unembeddable.len();
        for &column in &group {
            output.map_column(column, |value| {
                let normalized = clustering.map.apply(value);
                if normalized != value {
                    report.cells_rewritten += 1;
                }
                normalized
            });
        }
        all_clusters.extend(clustering.clusters);
    }
    report.summary = cluster_summary(&all_clusters);

    for cluster in all_clusters
        .iter()
        .filter(|cluster| cluster.len() > 1)
        .take(LOGGED_CLUSTER_PREVIEW)
    {
        info!(
            "[uicrit:normalize] {:?} <- {:?}",
            cluster.representative, cluster.members
        );
    }
    Ok((output, report))
}

/// Read `input`, normalize its phrase columns and write the result to `output`.
pub fn run_normalizer(
    input: &Path,
    output: &Path,
    model: &LanguageModel,
    config: &ClusterConfig,
    output_config: &OutputConfig,
) -> Result<NormalizeReport, PipelineError> {
    let table = read_table(input)?;
    let (normalized, report) = normalize_table(model, &table, config)?;
    if report.embeddable == 0 {
        warn!("[uicrit:normalize] no phrase had an embeddable token; values are only cleaned");
    }
    write_table(output, &normalized, output_config.write_bom)?;
    let (clusters, largest) = report
        .summary
        .as_ref()
        .map_or((0, 0), |summary| (summary.clusters, summary.largest));
    info!(
        "[uicrit:normalize] {} phrases ({} embeddable) -> {} clusters (largest {}), {} cells rewritten -> {}",
        report.phrases,
        report.embeddable,
        clusters,
        largest,
        report.cells_rewritten,
        output.display()
    );
    Ok(report)
}
