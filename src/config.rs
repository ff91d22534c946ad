use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::cluster::{DEFAULT_DISTANCE_THRESHOLD, TARGET_SUFFIXES};
use crate::constants::segment::MAX_COMMENTS;
use crate::constants::task::VAGUE_VERBS;
use crate::constants::columns;
use crate::errors::PipelineError;

/// Controls how raw comment blobs are split into slots.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Max comment slots per record; extra blocks are dropped.
    pub max_comments: usize,
    /// Column holding the record id.
    pub id_column: String,
    /// Column holding the raw comment blob.
    pub comments_column: String,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_comments: MAX_COMMENTS,
            id_column: columns::ID.to_string(),
            comments_column: columns::COMMENTS.to_string(),
        }
    }
}

/// Controls the critique extractor table pass.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Number of `comment{i}_text` columns probed.
    pub max_comments: usize,
    /// Whether `comment{i}_type` / `comment{i}_text` are removed from the output.
    pub drop_source_columns: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_comments: MAX_COMMENTS,
            drop_source_columns: true,
        }
    }
}

/// Strategy used to reduce an object phrase to a single head noun.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimplificationMethod {
    /// Highest corpus-wide inverse document frequency wins.
    #[default]
    Idf,
    /// Root of the final noun chunk in the phrase.
    NounChunk,
}

/// Controls the companion task phrase extractor.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Column holding the task description.
    pub task_column: String,
    /// Root verbs whose clausal complement is preferred.
    pub vague_verbs: Vec<String>,
    /// Head-noun simplification strategy.
    pub simplification: SimplificationMethod,
    /// Prefix the task output with a UTF-8 byte order mark for spreadsheet tools.
    pub write_bom: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            task_column: columns::TASK.to_string(),
            vague_verbs: VAGUE_VERBS.iter().map(|verb| verb.to_string()).collect(),
            simplification: SimplificationMethod::default(),
            write_bom: true,
        }
    }
}

/// Whether triple fields share one phrase space during clustering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterScope {
    /// Problem, verb and object phrases are clustered together.
    #[default]
    Pooled,
    /// Each field family is clustered on its own.
    PerField,
}

/// Controls phrase clustering and normalization.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Cosine distance at or above which clusters are not merged.
    pub distance_threshold: f64,
    /// Pooled vs per-field clustering.
    pub scope: ClusterScope,
    /// Column suffixes selecting the normalized columns.
    pub target_suffixes: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            scope: ClusterScope::default(),
            target_suffixes: TARGET_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClusterConfig {
    /// Reject thresholds that cannot describe a cosine distance cut.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.distance_threshold.is_finite()
            && self.distance_threshold > 0.0
            && self.distance_threshold <= 2.0)
        {
            return Err(PipelineError::Configuration(format!(
                "distance_threshold must be in (0, 2], got {}",
                self.distance_threshold
            )));
        }
        if self.target_suffixes.is_empty() {
            return Err(PipelineError::Configuration(
                "target_suffixes must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locations of the linguistic resources loaded once per run.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// CoNLL-U files holding pre-computed dependency parses.
    pub annotations: Vec<PathBuf>,
    /// Word vectors in GloVe / word2vec text format.
    pub vectors: Option<PathBuf>,
    /// Extra stop words appended to the built-in English list.
    pub extra_stop_words: Vec<String>,
}

/// Controls how segment, extract, normalize and flatten outputs are written.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix output files with a UTF-8 byte order mark.
    pub write_bom: bool,
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Comment segmenter settings.
    pub segment: SegmenterConfig,
    /// Critique extractor settings.
    pub extract: ExtractorConfig,
    /// Task phrase extractor settings.
    pub task: TaskConfig,
    /// Phrase clustering settings.
    pub cluster: ClusterConfig,
    /// Linguistic resource locations.
    pub model: ModelConfig,
    /// Output writing settings.
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load a JSON configuration file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.cluster.validate()?;
        Ok(config)
    }
}
