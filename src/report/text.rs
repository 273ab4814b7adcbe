use crate::report::{SummaryData, format_f32_6};

const TOP_TFS_IN_TEXT: usize = 10;
const UNSCORED_TFS_IN_TEXT: usize = 8;

pub fn render_report_text(data: &SummaryData) -> String {
    let mut out = String::new();

    out.push_str("Transcription Factor Activity Report\n");
    out.push_str("====================================\n\n");

    out.push_str("1. Input\n");
    out.push_str(&format!(
        "Cells: {}\nGenes (mappable / raw features): {} / {}\n",
        data.input.n_cells, data.input.n_genes_mappable, data.input.n_features_raw
    ));
    if let Some(prefix) = &data.input.files.prefix {
        out.push_str(&format!("File prefix: {prefix}\n"));
    }
    out.push_str(&format!("Expression slot: {}\n", data.input.source));
    out.push_str(&format!(
        "Library size median: {}\nDetected genes median: {}\n\n",
        format_f32_6(data.input.libsize_median),
        format_f32_6(data.input.nnz_median)
    ));

    out.push_str("2. Regulon\n");
    out.push_str(&format!("Confidence tiers: {}\n", data.regulon.confidence));
    out.push_str(&format!(
        "Interactions kept: {} of {}\n",
        data.regulon.n_rows_kept, data.regulon.n_rows_read
    ));
    out.push_str(&format!(
        "TFs: {} ({} scored)\n",
        data.regulon.n_tfs, data.regulon.n_tfs_scored
    ));
    out.push_str(&format!(
        "{}\n\n",
        coverage_statement(data.regulon.n_tfs_scored, data.regulon.n_tfs)
    ));

    out.push_str("3. Activity\n");
    let options = &data.scoring.options;
    out.push_str(&format!(
        "Signature method: {}\nMinimum regulon size: {}\nExpression filtered to targets: {}\nCores: {}\n",
        options.method, options.minsize, options.eset_filter, options.cores
    ));
    out.push_str(&format!(
        "Score median: {}\nScore p10 / p90: {} / {}\n\n",
        format_f32_6(data.activity.median),
        format_f32_6(data.activity.p10),
        format_f32_6(data.activity.p90)
    ));

    out.push_str("4. Clusters\n");
    match &data.clusters.column {
        Some(column) => out.push_str(&format!("Cluster column: {}\n", column)),
        None => out.push_str("Cluster column: none (all cells pooled)\n"),
    }
    let sizes: Vec<String> = data
        .clusters
        .sizes
        .iter()
        .map(|(name, n)| format!("{name} ({n})"))
        .collect();
    out.push_str(&format!("Clusters: {}\n", sizes.join(", ")));
    let top: Vec<&str> = data
        .clusters
        .top_tfs
        .iter()
        .take(TOP_TFS_IN_TEXT)
        .map(String::as_str)
        .collect();
    out.push_str(&format!("Most variable TFs: {}\n", top.join(", ")));
    if data.clusters.n_clusters < 2 {
        out.push_str("Note: a single cluster has no between-cluster variance; TFs are listed by name.\n");
    }
    out.push('\n');

    out.push_str("5. Quality and caveats\n");
    out.push_str(&format!(
        "Undefined score fraction: {}\n",
        format_f32_6(data.activity.nan_fraction)
    ));
    if data.activity.nan_fraction > 0.0 {
        out.push_str("Note: TFs whose likelihoods are all zero cannot be weighted and score NaN.\n");
    }
    if !data.regulon.unscored_tfs.is_empty() {
        let shown: Vec<&str> = data
            .regulon
            .unscored_tfs
            .iter()
            .take(UNSCORED_TFS_IN_TEXT)
            .map(String::as_str)
            .collect();
        let more = data.regulon.unscored_tfs.len() - shown.len();
        out.push_str(&format!(
            "Below minimum regulon size: {}{}\n",
            shown.join(", "),
            if more > 0 {
                format!(" (+{more} more)")
            } else {
                String::new()
            }
        ));
    }
    if data.input.n_empty_cells > 0 {
        out.push_str(&format!(
            "Cells without counts: {}\n",
            data.input.n_empty_cells
        ));
    }

    out
}

fn coverage_statement(scored: usize, total: usize) -> &'static str {
    if total == 0 {
        return "No TF passed the confidence filter.";
    }
    let frac = scored as f32 / total as f32;
    if frac >= 0.75 {
        "Most regulons are well covered by the expression data."
    } else if frac >= 0.40 {
        "Regulon coverage is partial; small regulons were dropped."
    } else {
        "Regulon coverage is low; check gene symbols and species."
    }
}
