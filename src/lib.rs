#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runner behind the `uicrit` binary.
pub mod apps;
/// Average-linkage clustering over cosine distance.
pub mod cluster;
/// Stage configuration types.
pub mod config;
/// Centralized constants used across stages.
pub mod constants;
/// Record, comment slot and triple types.
pub mod data;
/// Critique triple extraction.
pub mod extract;
/// Wide-to-long pivot of extracted triples.
pub mod flatten;
/// Aggregate metrics helpers.
pub mod metrics;
/// Parse trees, annotation stores, word vectors and stop words.
pub mod nlp;
/// Phrase clustering and normalization.
pub mod normalize;
/// Comment segmentation.
pub mod segment;
/// In-memory CSV table.
pub mod table;
/// Task verb and object extraction.
pub mod task;
/// Inverse document frequency over task objects.
pub mod tfidf;
/// CSV transports (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;

pub use cluster::{Dendrogram, Merge, cosine_distance};
pub use config::{
    ClusterConfig, ClusterScope, ExtractorConfig, ModelConfig, OutputConfig, PipelineConfig,
    SegmenterConfig, SimplificationMethod, TaskConfig,
};
pub use data::{CommentSlot, CommentType, CritiqueTriple, PhraseCluster, Record, TaskExtraction};
pub use errors::PipelineError;
pub use extract::{CritiqueExtractor, ExtractionReport};
pub use flatten::{FlattenReport, to_long};
pub use metrics::{ClusterSummary, ExtractionCoverage};
pub use nlp::{AnnotationStore, DependencyParser, Doc, LanguageModel, StopWords, WordVectors};
pub use normalize::{NormalizationMap, NormalizeReport, PhraseClustering};
pub use segment::{SegmentReport, segment_comments};
pub use table::Table;
pub use task::{ParsedTask, TaskExtractor, TaskReport};
pub use tfidf::IdfTable;
pub use types::{AnnotatedText, ColumnName, Lemma, Phrase, RecordId, Vector};
