use crate::data::{CritiqueTriple, PhraseCluster, is_known};

/// How many extracted triples filled each field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractionCoverage {
    /// Triples counted.
    pub total: usize,
    /// Triples with no `unknown` field.
    pub valid: usize,
    /// Triples whose `problem` is `unknown`.
    pub unknown_problem: usize,
    /// Triples whose `solution_verb` is `unknown`.
    pub unknown_verb: usize,
    /// Triples whose `solution_obj` is `unknown`.
    pub unknown_obj: usize,
    /// Share of triples with all three fields known.
    pub valid_share: f64,
}

/// Size distribution of a phrase clustering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterSummary {
    /// Distinct phrases that entered clustering.
    pub phrases: usize,
    /// Flat clusters after the threshold cut.
    pub clusters: usize,
    /// Clusters holding a single phrase.
    pub singletons: usize,
    /// Size of the biggest cluster.
    pub largest: usize,
    /// Phrases per cluster; 1.0 means nothing merged.
    pub mean_size: f64,
}

/// Count unknown fields over a batch of triples.
pub fn extraction_coverage<'a, I>(triples: I) -> ExtractionCoverage
where
    I: IntoIterator<Item = &'a CritiqueTriple>,
{
    let mut coverage = ExtractionCoverage::default();
    for triple in triples {
        coverage.total += 1;
        if triple.is_valid() {
            coverage.valid += 1;
        }
        if !is_known(&triple.problem) {
            coverage.unknown_problem += 1;
        }
        if !is_known(&triple.solution_verb) {
            coverage.unknown_verb += 1;
        }
        if !is_known(&triple.solution_obj) {
            coverage.unknown_obj += 1;
        }
    }
    coverage.valid_share = if coverage.total == 0 {
        0.0
    } else {
        coverage.valid as f64 / coverage.total as f64
    };
    coverage
}

/// Summarize cluster sizes; `None` when there are no clusters.
pub fn cluster_summary(clusters: &[PhraseCluster]) -> Option<ClusterSummary> {
    if clusters.is_empty() {
        return None;
    }
    let phrases: usize = clusters.iter().map(PhraseCluster::len).sum();
    let largest = clusters.iter().map(PhraseCluster::len).max().unwrap_or(0);
    let singletons = clusters.iter().filter(|cluster| cluster.len() == 1).count();
    let mean_size = phrases as f64 / clusters.len() as f64;
    Some(ClusterSummary {
        phrases,
        clusters: clusters.len(),
        singletons,
        largest,
        mean_size,
    })
}
