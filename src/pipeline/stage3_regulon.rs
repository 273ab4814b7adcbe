use std::path::Path;

use tracing::info;

use crate::regulon::mapping::{RegulonAudit, audit_regulon, build_symbol_map};
use crate::regulon::{
    ConfidenceFilter, Regulon, RegulonError, build_regulon, filter_by_confidence,
    read_interactions,
};

#[derive(Debug, Clone)]
pub struct Stage3Params<'a> {
    pub table_path: &'a Path,
    pub confidence: &'a ConfidenceFilter,
}

#[derive(Debug, Clone)]
pub struct Stage3Output {
    pub n_rows_read: usize,
    pub n_rows_kept: usize,
    pub regulon: Regulon,
    pub audits: Vec<RegulonAudit>,
}

/// Reads the interaction table, applies the confidence filter, builds the
/// regulon and checks which targets exist among `gene_symbols`.
pub fn run_stage3(
    params: &Stage3Params<'_>,
    gene_symbols: &[String],
) -> Result<Stage3Output, RegulonError> {
    let records = read_interactions(params.table_path)?;
    let kept = filter_by_confidence(&records, params.confidence);
    let n_rows_kept = kept.len();
    let regulon = build_regulon(kept);

    let symbol_map = build_symbol_map(gene_symbols.iter().map(String::as_str));
    let audits = audit_regulon(&regulon, &symbol_map);
    let n_unmapped_tfs = audits.iter().filter(|a| a.n_mappable == 0).count();

    info!(
        confidence = %params.confidence,
        n_rows_read = records.len(),
        n_rows_kept,
        n_tfs = regulon.len(),
        n_interactions = regulon.n_interactions(),
        n_unmapped_tfs,
        "stage3 regulon ready"
    );

    Ok(Stage3Output {
        n_rows_read: records.len(),
        n_rows_kept,
        regulon,
        audits,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_regulon.rs"]
mod tests;
