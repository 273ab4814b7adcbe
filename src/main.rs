mod cli;
mod expr;
mod input;
mod logging;
mod pipeline;
mod regulon;
mod report;
mod viper;

use std::io::{BufWriter, Write};

use clap::Parser;
use thiserror::Error;
use tracing::info;

use crate::cli::{Cli, Commands, RegulonArgs, RunArgs};
use crate::input::InputError;
use crate::pipeline::stage1_input::{Stage1Params, run_stage1};
use crate::pipeline::stage2_normalize::run_stage2;
use crate::pipeline::stage3_regulon::{Stage3Params, run_stage3};
use crate::pipeline::stage4_activity::run_stage4;
use crate::pipeline::stage5_clusters::run_stage5;
use crate::pipeline::stage6_report::{Stage6Input, write_reports};
use crate::regulon::builder::summarize_regulon;
use crate::regulon::{RegulonError, build_regulon, filter_by_confidence, read_interactions};
use crate::report::{ReportError, format_f32_6};
use crate::viper::ScoreError;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Regulon(#[from] RegulonError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(wants_verbose(&cli));

    if let Err(err) = run(cli) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

/// `--verbose` or a `verbose=true` scoring option; bad options fall back
/// to the flag and are reported once the run starts.
fn wants_verbose(cli: &Cli) -> bool {
    match &cli.command {
        Commands::Run(args) => args
            .score_options()
            .map(|options| options.verbose)
            .unwrap_or(args.verbose),
        Commands::Regulon(_) => false,
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Run(args) => run_pipeline(&args),
        Commands::Regulon(args) => print_regulon_summary(&args, &mut std::io::stdout().lock()),
    }
}

fn run_pipeline(args: &RunArgs) -> Result<(), AppError> {
    // reject bad options before any input is read
    let options = args.score_options()?;
    let parallel = args.parallel();

    let stage1 = run_stage1(&Stage1Params {
        input_dir: &args.input,
        meta_path: args.meta.as_deref(),
        cluster_column: &args.cluster_column,
    })?;
    let bundle = &stage1.bundle;

    let source = args.source.into();
    let stage2 = run_stage2(bundle, source)?;

    let stage3 = run_stage3(
        &Stage3Params {
            table_path: &args.regulon,
            confidence: &args.confidence,
        },
        &bundle.gene_index.symbols_by_gene_id,
    )?;

    let stage4 = run_stage4(&stage2.experiment, &stage3.regulon, &options, &parallel)?;
    let clusters = run_stage5(&stage4.activity, &stage1.cluster_labels, args.top_tfs)?;

    let summary = write_reports(
        &Stage6Input {
            input_dir: &args.input,
            table_path: &args.regulon,
            bundle,
            accessor: &stage2.accessor,
            source,
            confidence: &args.confidence,
            regulon: &stage3,
            activity: &stage4,
            clusters: &clusters,
            cluster_column: args.meta.as_ref().map(|_| args.cluster_column.as_str()),
            options: &options,
            parallel: &parallel,
            tool_name: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        &args.out,
    )?;

    info!(
        n_tfs_scored = summary.regulon.n_tfs_scored,
        n_cells = summary.input.n_cells,
        out = %args.out.display(),
        "done"
    );
    Ok(())
}

fn print_regulon_summary(args: &RegulonArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let records = read_interactions(&args.regulon)?;
    let regulon = build_regulon(filter_by_confidence(&records, &args.confidence));

    let mut w = BufWriter::new(out);
    writeln!(w, "tf\tn_targets\tn_activating\tn_repressing\tlikelihood_sum")?;
    for row in summarize_regulon(&regulon) {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            row.tf,
            row.n_targets,
            row.n_activating,
            row.n_repressing,
            format_f32_6(row.likelihood_sum)
        )?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
