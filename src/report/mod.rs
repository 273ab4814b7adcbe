use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::viper::{ParallelConfig, ScoreOptions};

pub mod json;
pub mod text;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// The three 10x files actually read, after prefix detection.
#[derive(Debug, Clone, Serialize)]
pub struct InputFiles {
    pub matrix: String,
    pub features: String,
    pub barcodes: String,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub input_dir: String,
    pub files: InputFiles,
    pub source: String,
    pub n_cells: usize,
    pub n_features_raw: usize,
    pub n_genes_mappable: usize,
    pub libsize_median: f32,
    pub nnz_median: f32,
    pub n_empty_cells: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegulonSummary {
    pub table: String,
    pub confidence: String,
    pub n_rows_read: usize,
    pub n_rows_kept: usize,
    pub n_tfs: usize,
    pub n_interactions: usize,
    pub n_tfs_scored: usize,
    pub unscored_tfs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoringSummary {
    pub options: ScoreOptions,
    pub parallel: ParallelConfig,
}

/// Distribution of the finite activity scores.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub n_values: usize,
    pub median: f32,
    pub p10: f32,
    pub p90: f32,
    pub nan_fraction: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterStats {
    pub column: Option<String>,
    pub n_clusters: usize,
    pub sizes: BTreeMap<String, usize>,
    pub top_tfs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub tool: ToolInfo,
    pub input: InputSummary,
    pub regulon: RegulonSummary,
    pub scoring: ScoringSummary,
    pub activity: ActivityStats,
    pub clusters: ClusterStats,
}

impl ActivityStats {
    pub fn from_scores(values: &[f32]) -> Self {
        let finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let nan_fraction = if values.is_empty() {
            0.0
        } else {
            (values.len() - finite.len()) as f32 / values.len() as f32
        };
        Self {
            n_values: values.len(),
            median: median(&finite),
            p10: p10(&finite),
            p90: p90(&finite),
            nan_fraction,
        }
    }
}

pub fn format_f32_6(v: f32) -> String {
    format!("{:.6}", v)
}

/// Nearest-rank quantile (rounding up); NaN for an empty slice.
pub fn quantile_indexed(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let n = sorted.len();
    let idx = ((n - 1) as f32 * p).ceil() as usize;
    sorted[idx]
}

pub fn median(values: &[f32]) -> f32 {
    quantile_indexed(values, 0.5)
}

pub fn p10(values: &[f32]) -> f32 {
    quantile_indexed(values, 0.10)
}

pub fn p90(values: &[f32]) -> f32 {
    quantile_indexed(values, 0.90)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
