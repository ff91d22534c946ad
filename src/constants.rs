/// Sentinel written into any extracted field that could not be determined.
///
/// This is a data value, not a missing-value marker: empty cells and
/// `unknown` cells are kept distinct throughout the pipeline.
pub const UNKNOWN: &str = "unknown";

/// Constants used by the comment segmenter.
pub mod segment {
    /// Maximum number of comment slots kept per record.
    pub const MAX_COMMENTS: usize = 7;
    /// Pattern matching one comment block inside the raw `comments` field.
    pub const COMMENT_BLOCK_PATTERN: &str =
        r"(?s)((?:LLM\s)?Comment\s\d.*?(?:Bounding Box:.*?\]))";
    /// Header prefix that marks a model-written comment.
    pub const LLM_HEADER_PREFIX: &str = "LLM";
    /// Escaped newline as it appears inside exported comment lists.
    pub const ESCAPED_NEWLINE: &str = "\\n";
    /// Characters stripped from both ends of a block and its body.
    pub const QUOTE_CHARS: [char; 2] = ['\'', '"'];
}

/// Constants used by the critique extractor.
pub mod extract {
    /// Template splitting a critique into its problem and solution clauses.
    pub const CRITIQUE_TEMPLATE_PATTERN: &str =
        r"(?is)In the current design,?(.*?)(?:To fix this,)(.*)";
    /// Parenthetical asides removed before matching.
    pub const PAREN_ASIDE_PATTERN: &str = r"\([^)]*\)";
    /// Bracketed asides (bounding boxes included) removed before matching.
    pub const BRACKET_ASIDE_PATTERN: &str = r"\[[^)]*\]";
    /// Single-quoted asides removed before matching.
    pub const QUOTED_ASIDE_PATTERN: &str = r"'[^)]*'";
}

/// Constants used by the companion task phrase extractor.
pub mod task {
    /// Root verbs too vague to carry the task; their clausal complement is preferred.
    pub const VAGUE_VERBS: [&str; 3] = ["click", "view", "go"];
    /// Token pattern used when fitting document frequencies (two or more word chars).
    pub const IDF_TOKEN_PATTERN: &str = r"\b\w\w+\b";
}

/// Constants used by the phrase normalizer.
pub mod cluster {
    /// Default cosine-distance cut applied to the average-linkage dendrogram.
    pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.3;
    /// Column suffixes whose values take part in normalization.
    pub const TARGET_SUFFIXES: [&str; 3] = ["_problem", "_verb", "_obj"];
    /// Number of example clusters logged after clustering.
    pub const LOGGED_CLUSTER_PREVIEW: usize = 5;
}

/// Column names shared between stages.
pub mod columns {
    /// Record identifier column.
    pub const ID: &str = "id";
    /// Raw comment blob consumed by the segmenter.
    pub const COMMENTS: &str = "comments";
    /// Task description consumed by the task extractor.
    pub const TASK: &str = "task";
    /// Verb column written by the task extractor.
    pub const TASK_VERB: &str = "verb";
    /// Object column written by the task extractor.
    pub const TASK_OBJ: &str = "obj";
    /// Problem column of the flattened long table.
    pub const LONG_PROBLEM: &str = "comment_problem";
    /// Verb column of the flattened long table.
    pub const LONG_VERB: &str = "comment_verb";
    /// Object column of the flattened long table.
    pub const LONG_OBJ: &str = "comment_obj";
    /// Pattern recognising per-slot triple columns in the wide table.
    pub const SLOT_TRIPLE_PATTERN: &str = r"^comment(\d+)_(?:solution_)?(problem|verb|obj)$";

    /// `comment{slot}_type`
    pub fn slot_type(slot: usize) -> String {
        format!("comment{slot}_type")
    }

    /// `comment{slot}_text`
    pub fn slot_text(slot: usize) -> String {
        format!("comment{slot}_text")
    }

    /// `comment{slot}_problem`
    pub fn slot_problem(slot: usize) -> String {
        format!("comment{slot}_problem")
    }

    /// `comment{slot}_solution_verb`
    pub fn slot_solution_verb(slot: usize) -> String {
        format!("comment{slot}_solution_verb")
    }

    /// `comment{slot}_solution_obj`
    pub fn slot_solution_obj(slot: usize) -> String {
        format!("comment{slot}_solution_obj")
    }
}
