use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind};
use tracing::warn;

use crate::config::{ClusterScope, ModelConfig, PipelineConfig, SimplificationMethod};
use crate::errors::PipelineError;
use crate::extract::run_extractor;
use crate::flatten::run_flatten;
use crate::nlp::{AnnotationStore, LanguageModel};
use crate::normalize::run_normalizer;
use crate::segment::run_segmenter;
use crate::task::run_task_extractor;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Pooled,
    PerField,
}

impl From<ScopeArg> for ClusterScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Pooled => ClusterScope::Pooled,
            ScopeArg::PerField => ClusterScope::PerField,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SimplificationArg {
    Idf,
    NounChunk,
}

impl From<SimplificationArg> for SimplificationMethod {
    fn from(value: SimplificationArg) -> Self {
        match value {
            SimplificationArg::Idf => SimplificationMethod::Idf,
            SimplificationArg::NounChunk => SimplificationMethod::NounChunk,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "uicrit",
    disable_help_subcommand = true,
    about = "Extract and normalize UI critique triples",
    long_about = "Segment exported critique lists, extract (problem, verb, object) triples from each comment, normalize paraphrased phrases by clustering, and flatten the result to one row per comment.",
    after_help = "Flags override the matching keys of --config. Set RUST_LOG=info to see per-stage summaries."
)]
struct UicritCli {
    #[command(subcommand)]
    command: StageCommand,
}

#[derive(Debug, Subcommand)]
enum StageCommand {
    /// Split the raw `comments` field into typed comment slots.
    Segment(SegmentArgs),
    /// Extract critique triples from segmented comment slots.
    Extract(ExtractArgs),
    /// Extract verb and object phrases from task descriptions.
    Tasks(TaskArgs),
    /// Cluster paraphrased phrases and rewrite them to a representative.
    Normalize(NormalizeArgs),
    /// Pivot per-slot triples into one row per comment.
    Flatten(FlattenArgs),
}

#[derive(Debug, Args)]
struct IoArgs {
    #[arg(long, value_name = "CSV", help = "Input CSV file")]
    input: PathBuf,
    #[arg(long, value_name = "CSV", help = "Output CSV file (parent directories are created)")]
    output: PathBuf,
    #[arg(long, value_name = "JSON", help = "Optional pipeline configuration file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Prefix the output with a UTF-8 byte order mark")]
    bom: bool,
}

#[derive(Debug, Args)]
struct ModelArgs {
    #[arg(
        long = "annotations",
        value_name = "CONLLU",
        help = "CoNLL-U file with pre-computed parses, repeat as needed"
    )]
    annotations: Vec<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Word vectors in text format")]
    vectors: Option<PathBuf>,
}

impl ModelArgs {
    fn apply(self, model: &mut ModelConfig) {
        model.annotations.extend(self.annotations);
        if let Some(vectors) = self.vectors {
            model.vectors = Some(vectors);
        }
    }
}

#[derive(Debug, Args)]
struct SegmentArgs {
    #[command(flatten)]
    io: IoArgs,
    #[arg(
        long = "max-comments",
        value_parser = parse_positive_usize,
        help = "Maximum comment slots per record"
    )]
    max_comments: Option<usize>,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[command(flatten)]
    io: IoArgs,
    #[command(flatten)]
    model: ModelArgs,
    #[arg(
        long = "max-comments",
        value_parser = parse_positive_usize,
        help = "Number of comment slots probed"
    )]
    max_comments: Option<usize>,
    #[arg(long = "keep-source-columns", help = "Keep comment type and text columns")]
    keep_source_columns: bool,
    #[arg(
        long = "unannotated-out",
        value_name = "PATH",
        help = "Write texts missing from the annotations here, one per line"
    )]
    unannotated_out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TaskArgs {
    #[command(flatten)]
    io: IoArgs,
    #[command(flatten)]
    model: ModelArgs,
    #[arg(long, value_enum, help = "Head noun simplification strategy")]
    simplification: Option<SimplificationArg>,
    #[arg(long = "no-bom", conflicts_with = "bom", help = "Write the output without a byte order mark")]
    no_bom: bool,
    #[arg(
        long = "unannotated-out",
        value_name = "PATH",
        help = "Write task texts missing from the annotations here, one per line"
    )]
    unannotated_out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    #[command(flatten)]
    io: IoArgs,
    #[command(flatten)]
    model: ModelArgs,
    #[arg(long, help = "Cosine distance threshold for merging clusters")]
    threshold: Option<f64>,
    #[arg(long, value_enum, help = "Cluster all fields together or each field family alone")]
    scope: Option<ScopeArg>,
}

#[derive(Debug, Args)]
struct FlattenArgs {
    #[command(flatten)]
    io: IoArgs,
}

/// Entry point of the `uicrit` binary; `args_iter` excludes the program name.
pub fn run<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<UicritCli, _>(std::iter::once("uicrit".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    match cli.command {
        StageCommand::Segment(args) => run_segment(args),
        StageCommand::Extract(args) => run_extract(args),
        StageCommand::Tasks(args) => run_tasks(args),
        StageCommand::Normalize(args) => run_normalize(args),
        StageCommand::Flatten(args) => run_flatten_stage(args),
    }
}

fn run_segment(args: SegmentArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args.io.config.as_deref())?;
    config.output.write_bom |= args.io.bom;
    if let Some(max_comments) = args.max_comments {
        config.segment.max_comments = max_comments;
    }
    let report = run_segmenter(&args.io.input, &args.io.output, &config.segment, &config.output)?;
    println!(
        "segmented {} records into {} comment slots ({} llm, {} records without comments)",
        report.records, report.slots, report.llm_slots, report.empty_records
    );
    Ok(())
}

fn run_extract(args: ExtractArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args.io.config.as_deref())?;
    config.output.write_bom |= args.io.bom;
    args.model.apply(&mut config.model);
    if let Some(max_comments) = args.max_comments {
        config.extract.max_comments = max_comments;
    }
    if args.keep_source_columns {
        config.extract.drop_source_columns = false;
    }
    let parser = load_annotations(&config.model)?;
    let report = run_extractor(
        &args.io.input,
        &args.io.output,
        &parser,
        &config.extract,
        &config.output,
        args.unannotated_out.as_deref(),
    )?;
    let coverage = report.coverage;
    println!(
        "extracted {} triples, {} complete ({:.1}%), {} texts unannotated",
        coverage.total,
        coverage.valid,
        coverage.valid_share * 100.0,
        report.unannotated.len()
    );
    Ok(())
}

fn run_tasks(args: TaskArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args.io.config.as_deref())?;
    args.model.apply(&mut config.model);
    if args.io.bom {
        config.task.write_bom = true;
    }
    if args.no_bom {
        config.task.write_bom = false;
    }
    if let Some(simplification) = args.simplification {
        config.task.simplification = simplification.into();
    }
    let parser = load_annotations(&config.model)?;
    let report = run_task_extractor(
        &args.io.input,
        &args.io.output,
        &parser,
        &config.task,
        args.unannotated_out.as_deref(),
    )?;
    println!(
        "processed {} tasks: {} with a verb, {} with an object, {} texts unannotated",
        report.rows,
        report.with_verb,
        report.with_obj,
        report.unannotated.len()
    );
    Ok(())
}

fn run_normalize(args: NormalizeArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args.io.config.as_deref())?;
    config.output.write_bom |= args.io.bom;
    args.model.apply(&mut config.model);
    if let Some(threshold) = args.threshold {
        config.cluster.distance_threshold = threshold;
    }
    if let Some(scope) = args.scope {
        config.cluster.scope = scope.into();
    }
    config.cluster.validate()?;
    if config.model.vectors.is_none() {
        return Err(PipelineError::Configuration(
            "normalize needs word vectors; pass --vectors or set model.vectors".to_string(),
        )
        .into());
    }
    let model = LanguageModel::load(&config.model)?;
    let report = run_normalizer(
        &args.io.input,
        &args.io.output,
        &model,
        &config.cluster,
        &config.output,
    )?;
    let clusters = report.summary.map_or(0, |summary| summary.clusters);
    println!(
        "normalized {} phrases into {} clusters, {} cells rewritten",
        report.phrases, clusters, report.cells_rewritten
    );
    Ok(())
}

fn run_flatten_stage(args: FlattenArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args.io.config.as_deref())?;
    config.output.write_bom |= args.io.bom;
    let report = run_flatten(&args.io.input, &args.io.output, &config.output)?;
    println!(
        "flattened {} comment rows, kept {}",
        report.before, report.after
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, PipelineError> {
    match path {
        Some(path) => PipelineConfig::from_json_file(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn load_annotations(model: &ModelConfig) -> Result<AnnotationStore, PipelineError> {
    if model.annotations.is_empty() {
        warn!("[uicrit:cli] no annotation files given; every text will be reported unannotated");
    }
    AnnotationStore::from_files(&model.annotations)
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
