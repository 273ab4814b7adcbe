use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::input::InputBundle;
use crate::pipeline::stage2_normalize::{ExprAccessor, ExprSourceKind};
use crate::pipeline::stage3_regulon::Stage3Output;
use crate::pipeline::stage4_activity::Stage4Output;
use crate::pipeline::stage5_clusters::ClusterActivity;
use crate::regulon::ConfidenceFilter;
use crate::report::json::render_summary_json;
use crate::report::text::render_report_text;
use crate::report::{
    ActivityStats, ClusterStats, InputFiles, InputSummary, RegulonSummary, ReportError, ScoringSummary,
    SummaryData, ToolInfo, format_f32_6, median,
};
use crate::viper::{ParallelConfig, ScoreOptions};

pub struct Stage6Input<'a> {
    pub input_dir: &'a Path,
    pub table_path: &'a Path,
    pub bundle: &'a InputBundle,
    pub accessor: &'a dyn ExprAccessor,
    pub source: ExprSourceKind,
    pub confidence: &'a ConfidenceFilter,
    pub regulon: &'a Stage3Output,
    pub activity: &'a Stage4Output,
    pub clusters: &'a ClusterActivity,
    pub cluster_column: Option<&'a str>,
    pub options: &'a ScoreOptions,
    pub parallel: &'a ParallelConfig,
    pub tool_name: String,
    pub tool_version: String,
}

pub fn write_reports(input: &Stage6Input<'_>, out_dir: &Path) -> Result<SummaryData, ReportError> {
    fs::create_dir_all(out_dir)?;

    write_activity_tsv(input, &out_dir.join("tf_activity.tsv"))?;
    write_audit_tsv(input, &out_dir.join("regulon_audit.tsv"))?;
    write_cluster_tsv(input.clusters, &out_dir.join("cluster_activity.tsv"))?;

    let summary = build_summary(input);
    write_text(&out_dir.join("summary.json"), &render_summary_json(&summary)?)?;
    write_text(&out_dir.join("report.txt"), &render_report_text(&summary))?;

    info!(out_dir = %out_dir.display(), "stage6 reports written");
    Ok(summary)
}

fn write_activity_tsv(input: &Stage6Input<'_>, path: &Path) -> std::io::Result<()> {
    let activity = &input.activity.activity;
    let mut w = BufWriter::new(File::create(path)?);
    write!(w, "tf")?;
    for cell in activity.cell_names() {
        write!(w, "\t{cell}")?;
    }
    writeln!(w)?;
    for (idx, tf) in activity.tf_names().iter().enumerate() {
        write!(w, "{tf}")?;
        for v in activity.tf_scores(idx) {
            write!(w, "\t{}", format_f32_6(v))?;
        }
        writeln!(w)?;
    }
    w.flush()
}

fn write_audit_tsv(input: &Stage6Input<'_>, path: &Path) -> std::io::Result<()> {
    let scored: HashSet<&str> = input
        .activity
        .activity
        .tf_names()
        .iter()
        .map(String::as_str)
        .collect();
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "tf\tn_targets\tn_mappable\tscored\tmissing_targets")?;
    for audit in &input.regulon.audits {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            audit.tf,
            audit.n_targets,
            audit.n_mappable,
            scored.contains(audit.tf.as_str()),
            audit.missing_targets.join(",")
        )?;
    }
    w.flush()
}

fn write_cluster_tsv(clusters: &ClusterActivity, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write!(w, "tf\tvariance")?;
    for name in &clusters.clusters {
        write!(w, "\t{name}")?;
    }
    writeln!(w)?;
    for &tf in &clusters.top {
        write!(
            w,
            "{}\t{}",
            clusters.tfs[tf],
            format_f32_6(clusters.variance[tf])
        )?;
        for &v in &clusters.means[tf] {
            write!(w, "\t{}", format_f32_6(v))?;
        }
        writeln!(w)?;
    }
    w.flush()
}

fn build_summary(input: &Stage6Input<'_>) -> SummaryData {
    let accessor = input.accessor;
    let bundle = input.bundle;
    let n_cells = accessor.n_cells();
    let libsizes: Vec<f32> = (0..n_cells).map(|c| accessor.libsize(c)).collect();
    let nnz: Vec<f32> = (0..n_cells).map(|c| accessor.nnz(c) as f32).collect();
    let n_empty_cells = (0..n_cells).filter(|&c| accessor.nnz(c) == 0).count();

    let activity = &input.activity.activity;
    let clusters = input.clusters;
    let sizes: BTreeMap<String, usize> = clusters
        .clusters
        .iter()
        .cloned()
        .zip(clusters.cluster_sizes.iter().copied())
        .collect();

    SummaryData {
        tool: ToolInfo {
            name: input.tool_name.clone(),
            version: input.tool_version.clone(),
        },
        input: InputSummary {
            input_dir: input.input_dir.display().to_string(),
            files: InputFiles {
                matrix: bundle.mtx_path.display().to_string(),
                features: bundle.features_path.display().to_string(),
                barcodes: bundle.barcodes_path.display().to_string(),
                prefix: bundle.prefix.clone(),
            },
            source: input.source.as_str().to_string(),
            n_cells,
            n_features_raw: bundle.n_features_raw,
            n_genes_mappable: bundle.n_genes_indexed,
            libsize_median: median(&libsizes),
            nnz_median: median(&nnz),
            n_empty_cells,
        },
        regulon: RegulonSummary {
            table: input.table_path.display().to_string(),
            confidence: input.confidence.to_string(),
            n_rows_read: input.regulon.n_rows_read,
            n_rows_kept: input.regulon.n_rows_kept,
            n_tfs: input.regulon.regulon.len(),
            n_interactions: input.regulon.regulon.n_interactions(),
            n_tfs_scored: activity.tf_names().len(),
            unscored_tfs: input.activity.unscored_tfs.clone(),
        },
        scoring: ScoringSummary {
            options: input.options.clone(),
            parallel: *input.parallel,
        },
        activity: ActivityStats::from_scores(activity.values()),
        clusters: ClusterStats {
            column: input.cluster_column.map(str::to_string),
            n_clusters: clusters.clusters.len(),
            sizes,
            top_tfs: clusters
                .top_tf_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        },
    }
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_report.rs"]
mod tests;
