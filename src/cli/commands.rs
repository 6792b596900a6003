//! CLI command definitions for qa-forge.
//!
//! Two commands wrap the curation engine: `filter` runs a full pass over a
//! JSONL file and writes the curated output, `analyze` prints statistics
//! and the diversity report of a file without changing it.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::diversity::{DiversityAnalyzer, DiversityReport};
use crate::export::{read_jsonl, write_output, OutputPaths, WriteSummary};
use crate::lexicon::Lexicon;
use crate::pipeline::{CorpusStats, CurationConfig, CurationEngine, FilterStats};

/// Quality and diversity curation for generated Q&A datasets.
#[derive(Parser)]
#[command(name = "qa-forge")]
#[command(about = "Filter, deduplicate and rebalance generated Q&A datasets")]
#[command(version)]
#[command(
    long_about = "qa-forge screens JSONL Q&A records for length, domain relevance and repetition,\nremoves exact and near duplicates, and rebalances over-represented question patterns.\n\nExample usage:\n  qa-forge filter data/raw.jsonl -o data/clean.jsonl --similarity 0.85\n  qa-forge analyze data/clean.jsonl"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Filter a JSONL dataset and write kept, removed and report files.
    Filter(FilterArgs),

    /// Print statistics and the question-pattern distribution of a dataset.
    #[command(alias = "stats")]
    Analyze(AnalyzeArgs),
}

/// Arguments for `qa-forge filter`.
#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// Input JSONL file.
    pub input: PathBuf,

    /// Output JSONL file (default: <input>.filtered.jsonl).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(long, env = "QA_FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lexicon file (.yaml, .yml or .json); the built-in lexicon otherwise.
    #[arg(long, env = "QA_FORGE_LEXICON")]
    pub lexicon: Option<PathBuf>,

    /// Minimum question length in characters.
    #[arg(long = "min-q-len")]
    pub min_question_length: Option<usize>,

    /// Minimum answer length in characters.
    #[arg(long = "min-a-len")]
    pub min_answer_length: Option<usize>,

    /// Minimum answer length in words.
    #[arg(long = "min-a-words")]
    pub min_answer_words: Option<usize>,

    /// Similarity at or above which two records are near duplicates.
    #[arg(long)]
    pub similarity: Option<f64>,

    /// Largest share a single question pattern may hold.
    #[arg(long)]
    pub max_pattern_ratio: Option<f64>,

    /// Rebalancing never shrinks the corpus below this size.
    #[arg(long = "min-floor")]
    pub min_corpus_floor: Option<usize>,

    /// Upper bound on rebalancing removals.
    #[arg(long = "max-passes")]
    pub max_rebalance_passes: Option<usize>,

    /// Skip rebalancing; report the distribution only.
    #[arg(long)]
    pub no_rebalance: bool,

    /// Output the summary as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `qa-forge analyze`.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// JSONL file to analyze.
    pub input: PathBuf,

    /// Lexicon file used to count on-topic records.
    #[arg(long, env = "QA_FORGE_LEXICON")]
    pub lexicon: Option<PathBuf>,

    /// YAML configuration file providing the pattern rules and ratio limit.
    #[arg(long, env = "QA_FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output the analysis as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and
/// `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Filter(args) => run_filter_command(args).await?,
        Commands::Analyze(args) => run_analyze_command(args).await?,
    }
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

/// Resolves the configuration: file, then environment, then flags.
fn resolve_config(args: &FilterArgs) -> anyhow::Result<CurationConfig> {
    let mut config = load_base_config(args.config.as_ref())?;

    if let Some(chars) = args.min_question_length {
        config = config.with_min_question_length(chars);
    }
    if let Some(chars) = args.min_answer_length {
        config = config.with_min_answer_length(chars);
    }
    if let Some(words) = args.min_answer_words {
        config = config.with_min_answer_words(words);
    }
    if let Some(threshold) = args.similarity {
        config = config.with_similarity_threshold(threshold);
    }
    if let Some(ratio) = args.max_pattern_ratio {
        config = config.with_max_pattern_ratio(ratio);
    }
    if let Some(floor) = args.min_corpus_floor {
        config = config.with_min_corpus_floor(floor);
    }
    if let Some(passes) = args.max_rebalance_passes {
        config = config.with_max_rebalance_passes(passes);
    }
    if args.no_rebalance {
        config = config.with_rebalance(false);
    }

    Ok(config)
}

fn load_base_config(path: Option<&PathBuf>) -> anyhow::Result<CurationConfig> {
    let mut config = match path {
        Some(path) => CurationConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CurationConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid QA_FORGE_* environment override")?;
    Ok(config)
}

fn load_lexicon(path: Option<&PathBuf>) -> anyhow::Result<Lexicon> {
    match path {
        Some(path) => {
            let lexicon = Lexicon::from_file(path)
                .with_context(|| format!("Failed to load lexicon from {}", path.display()))?;
            info!(path = %path.display(), terms = lexicon.len(), "Loaded lexicon");
            Ok(lexicon)
        }
        None => Ok(Lexicon::builtin()),
    }
}

// ============================================================================
// Filter Command
// ============================================================================

#[derive(Debug, Serialize)]
struct FilterCommandOutput {
    status: String,
    input: String,
    output: String,
    removed: String,
    report: String,
    stats: FilterStats,
    entropy: f64,
    recommendations: Vec<String>,
}

async fn run_filter_command(args: FilterArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        return Err(anyhow::anyhow!(
            "Input file does not exist: {}",
            args.input.display()
        ));
    }

    let config = resolve_config(&args)?;
    let lexicon = load_lexicon(args.lexicon.as_ref())?;
    let paths = match &args.output {
        Some(output) => OutputPaths::for_output(output),
        None => OutputPaths::default_for_input(&args.input),
    };

    let records = read_jsonl(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let engine = CurationEngine::new(config, lexicon).context("Invalid curation configuration")?;

    // The pass is CPU-bound; keep it off the async workers.
    let output = tokio::task::spawn_blocking(move || engine.run(records))
        .await
        .context("Curation task panicked")?
        .context("Curation pass failed")?;

    let WriteSummary { kept, removed, .. } = write_output(&paths, &output)
        .with_context(|| format!("Failed to write output to {}", paths.kept.display()))?;

    let report = &output.report;
    if args.json {
        let summary = FilterCommandOutput {
            status: if report.diversity.is_balanced() {
                "balanced".to_string()
            } else {
                "unbalanced".to_string()
            },
            input: args.input.display().to_string(),
            output: paths.kept.display().to_string(),
            removed: paths.removed.display().to_string(),
            report: paths.report.display().to_string(),
            stats: report.stats.clone(),
            entropy: report.diversity.entropy,
            recommendations: report.recommendations.clone(),
        };
        let json_output = serde_json::to_string_pretty(&summary)
            .context("Failed to serialize filter summary")?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("{}", report.summary());
    println!();
    println!("✓ Saved {} records to {}", kept, paths.kept.display());
    println!("  Removed: {} records to {}", removed, paths.removed.display());
    println!("  Report:  {}", paths.report.display());

    Ok(())
}

// ============================================================================
// Analyze Command
// ============================================================================

#[derive(Debug, Serialize)]
struct AnalyzeOutput {
    input: String,
    stats: CorpusStats,
    on_topic: usize,
    diversity: DiversityReport,
}

async fn run_analyze_command(args: AnalyzeArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        return Err(anyhow::anyhow!(
            "Input file does not exist: {}",
            args.input.display()
        ));
    }

    let config = load_base_config(args.config.as_ref())?;
    config.validate().context("Invalid curation configuration")?;
    let lexicon = load_lexicon(args.lexicon.as_ref())?;
    let analyzer = DiversityAnalyzer::from_config(&config.diversity)
        .context("Invalid pattern rules")?;

    let records = read_jsonl(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let stats = CorpusStats::from_records(&records);
    let diversity = analyzer.analyze_records(&records);
    let on_topic = records
        .iter()
        .filter(|r| lexicon.contains_term(&r.question) || lexicon.contains_term(&r.answer))
        .count();

    if args.json {
        let output = AnalyzeOutput {
            input: args.input.display().to_string(),
            stats,
            on_topic,
            diversity,
        };
        let json_output = serde_json::to_string_pretty(&output)
            .context("Failed to serialize analysis")?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("{}", stats.summary());
    let share = if records.is_empty() {
        0.0
    } else {
        on_topic as f64 / records.len() as f64 * 100.0
    };
    println!("- On-topic records: {} ({:.1}%)", on_topic, share);
    println!();
    println!("{}", diversity.summary());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_filter_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "qa-forge",
            "filter",
            "in.jsonl",
            "-o",
            "out.jsonl",
            "--min-q-len",
            "12",
            "--similarity",
            "0.9",
            "--max-pattern-ratio",
            "0.25",
            "--min-floor",
            "40",
            "--max-passes",
            "7",
            "-j",
        ])
        .unwrap();

        let Commands::Filter(args) = cli.command else {
            panic!("expected filter command");
        };
        assert!(args.json);
        assert_eq!(args.output, Some(PathBuf::from("out.jsonl")));

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.quality.min_question_length, 12);
        assert_eq!(config.quality.min_answer_length, 30);
        assert!((config.similarity.similarity_threshold - 0.9).abs() < 1e-12);
        assert!((config.diversity.max_pattern_ratio - 0.25).abs() < 1e-12);
        assert_eq!(config.diversity.min_corpus_floor, 40);
        assert_eq!(config.diversity.max_rebalance_passes, 7);
        assert!(config.diversity.rebalance);
    }

    #[test]
    fn test_global_log_level() {
        let cli = Cli::try_parse_from(["qa-forge", "analyze", "data.jsonl", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Analyze(_)));
    }

    #[test]
    fn test_no_rebalance_flag() {
        let cli = Cli::try_parse_from(["qa-forge", "filter", "in.jsonl", "--no-rebalance"]).unwrap();
        let Commands::Filter(args) = cli.command else {
            panic!("expected filter command");
        };
        assert!(!resolve_config(&args).unwrap().diversity.rebalance);
    }
}
