use std::path::Path;

use tracing::info;

use crate::input::{InputBundle, InputError, load_input_tenx};

/// Label used for every cell when no metadata table is given.
pub const ALL_CELLS_LABEL: &str = "all";
/// Label for cells whose metadata row has no cluster value.
pub const MISSING_LABEL: &str = "NA";

#[derive(Debug, Clone)]
pub struct Stage1Params<'a> {
    pub input_dir: &'a Path,
    pub meta_path: Option<&'a Path>,
    pub cluster_column: &'a str,
}

#[derive(Debug, Clone)]
pub struct Stage1Output {
    pub bundle: InputBundle,
    pub cluster_labels: Vec<String>,
}

pub fn run_stage1(params: &Stage1Params<'_>) -> Result<Stage1Output, InputError> {
    let bundle = load_input_tenx(params.input_dir, params.meta_path)?;
    let cluster_labels = cluster_labels(&bundle, params.cluster_column)?;
    info!(
        n_cells = bundle.n_cells,
        n_features = bundle.n_features_raw,
        n_genes = bundle.n_genes_indexed,
        has_meta = bundle.meta.is_some(),
        "stage1 input loaded"
    );
    Ok(Stage1Output {
        bundle,
        cluster_labels,
    })
}

/// One cluster label per barcode, taken from `column` of the metadata.
pub fn cluster_labels(bundle: &InputBundle, column: &str) -> Result<Vec<String>, InputError> {
    let Some(meta) = &bundle.meta else {
        return Ok(vec![ALL_CELLS_LABEL.to_string(); bundle.n_cells]);
    };
    let values = meta.column(column).ok_or_else(|| {
        InputError::InvalidInput(format!(
            "cluster column '{column}' not found in metadata (columns: {})",
            meta.columns.join(", ")
        ))
    })?;
    Ok(values
        .into_iter()
        .map(|v| {
            let v = v.trim();
            if v.is_empty() || v.eq_ignore_ascii_case("na") {
                MISSING_LABEL.to_string()
            } else {
                v.to_string()
            }
        })
        .collect())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_input.rs"]
mod tests;
