use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::pipeline::stage2_normalize::ExprSourceKind;
use crate::regulon::ConfidenceFilter;
use crate::viper::{ParallelConfig, ScoreError, ScoreOptions, SignatureMethod};

#[derive(Debug, Parser)]
#[command(
    name = "kira-tfactivity",
    version,
    about = "Per-cell transcription factor activity from 10x MTX inputs and curated regulons"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Score TF activity for every cell and write reports.
    Run(RunArgs),
    /// Print a per-TF summary of a filtered interaction table.
    Regulon(RegulonArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, help = "Input directory (10x MTX, optionally gzipped)")]
    pub input: PathBuf,

    #[arg(long, help = "TF-target interaction table (tsv/csv, optionally gzipped)")]
    pub regulon: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, default_value = "A,B,C", help = "Confidence tiers to keep")]
    pub confidence: ConfidenceFilter,

    #[arg(long, value_enum, default_value_t = SourceArg::Normalized)]
    pub source: SourceArg,

    #[arg(long, value_enum, default_value_t = MethodArg::Scale)]
    pub method: MethodArg,

    #[arg(long, default_value_t = 4, help = "Minimum measured targets per TF")]
    pub minsize: usize,

    #[arg(long, default_value_t = false, help = "Restrict genes to regulon targets")]
    pub eset_filter: bool,

    #[arg(long, default_value_t = 1)]
    pub cores: usize,

    #[arg(
        long,
        default_value_t = 8000,
        help = "Largest expression matrix (MB) shipped to worker threads"
    )]
    pub max_globals_mb: usize,

    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    #[arg(long, help = "Per-cell metadata TSV keyed by barcode")]
    pub meta: Option<PathBuf>,

    #[arg(long, default_value = "cluster")]
    pub cluster_column: String,

    #[arg(long, default_value_t = 180, help = "TFs kept in the cluster summary")]
    pub top_tfs: usize,

    #[arg(
        long = "option",
        value_name = "KEY=VALUE",
        help = "Extra scoring option (repeatable)"
    )]
    pub options: Vec<String>,
}

impl RunArgs {
    /// Typed flags first, then `--option` pairs on top.
    pub fn score_options(&self) -> Result<ScoreOptions, ScoreError> {
        ScoreOptions {
            method: self.method.into(),
            minsize: self.minsize,
            eset_filter: self.eset_filter,
            cores: self.cores,
            verbose: self.verbose,
        }
        .with_pairs(self.options.iter().map(String::as_str))
    }

    pub fn parallel(&self) -> ParallelConfig {
        ParallelConfig::from_megabytes(self.max_globals_mb)
    }
}

#[derive(Debug, Args)]
pub struct RegulonArgs {
    #[arg(long)]
    pub regulon: PathBuf,

    #[arg(long, default_value = "A,B,C")]
    pub confidence: ConfidenceFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Normalized,
    Logcounts,
}

impl From<SourceArg> for ExprSourceKind {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Normalized => ExprSourceKind::Normalized,
            SourceArg::Logcounts => ExprSourceKind::LogCounts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Scale,
    Rank,
    Mad,
    None,
}

impl From<MethodArg> for SignatureMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Scale => SignatureMethod::Scale,
            MethodArg::Rank => SignatureMethod::Rank,
            MethodArg::Mad => SignatureMethod::Mad,
            MethodArg::None => SignatureMethod::None,
        }
    }
}
