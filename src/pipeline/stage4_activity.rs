use std::time::Instant;

use tracing::info;

use crate::pipeline::stage2_normalize::Experiment;
use crate::regulon::Regulon;
use crate::viper::{ActivityMatrix, ParallelConfig, ScoreError, ScoreOptions, score_activity};

#[derive(Debug, Clone)]
pub struct Stage4Output {
    pub activity: ActivityMatrix,
    /// TFs of the regulon that received no score (too few measured targets).
    pub unscored_tfs: Vec<String>,
}

pub fn run_stage4(
    experiment: &Experiment,
    regulon: &Regulon,
    options: &ScoreOptions,
    parallel: &ParallelConfig,
) -> Result<Stage4Output, ScoreError> {
    let started = Instant::now();
    let input = experiment.as_score_input();
    let activity = score_activity(input, regulon, options, parallel)?;

    let unscored_tfs: Vec<String> = regulon
        .tf_names()
        .filter(|tf| !activity.tf_names().iter().any(|s| s.as_str() == *tf))
        .map(str::to_string)
        .collect();

    info!(
        input = input.kind(),
        method = %options.method,
        minsize = options.minsize,
        cores = options.cores,
        n_tfs_scored = activity.tf_names().len(),
        n_tfs_unscored = unscored_tfs.len(),
        n_cells = activity.cell_names().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stage4 activity scored"
    );

    Ok(Stage4Output {
        activity,
        unscored_tfs,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_activity.rs"]
mod tests;
