use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub mod barcodes;
pub mod features;
pub mod gz;
pub mod meta;
pub mod mtx;

use barcodes::parse_barcodes;
use features::{Feature, parse_features};
use meta::{CellMeta, load_meta};

#[derive(Debug, Clone)]
pub struct GeneIndex {
    pub gene_id_by_feature: Vec<Option<usize>>,
    pub symbols_by_gene_id: Vec<String>,
}

impl GeneIndex {
    pub fn n_genes(&self) -> usize {
        self.symbols_by_gene_id.len()
    }
}

#[derive(Debug, Clone)]
pub struct InputBundle {
    pub mtx_path: PathBuf,
    pub features_path: PathBuf,
    pub barcodes_path: PathBuf,
    pub prefix: Option<String>,
    pub n_cells: usize,
    pub n_features_raw: usize,
    pub n_genes_indexed: usize,
    pub gene_index: GeneIndex,
    pub barcodes: Vec<String>,
    pub meta: Option<CellMeta>,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error: {0}")]
    Parse(String),
}

pub fn load_input_tenx(
    input_dir: &Path,
    meta_path: Option<&Path>,
) -> Result<InputBundle, InputError> {
    if !input_dir.is_dir() {
        return Err(InputError::MissingInput(format!(
            "input directory {} does not exist",
            input_dir.display()
        )));
    }
    let prefix = detect_prefix(input_dir)?;
    let mtx_path = find_input_file(
        input_dir,
        prefix.as_deref(),
        &["matrix.mtx", "matrix.mtx.gz"],
    )?;
    let features_path = find_input_file(
        input_dir,
        prefix.as_deref(),
        &[
            "features.tsv",
            "features.tsv.gz",
            "genes.tsv",
            "genes.tsv.gz",
        ],
    )?;
    let barcodes_path = find_input_file(
        input_dir,
        prefix.as_deref(),
        &["barcodes.tsv", "barcodes.tsv.gz"],
    )?;

    info!(
        mtx = %mtx_path.display(),
        features = %features_path.display(),
        barcodes = %barcodes_path.display(),
        "discovered input files"
    );

    let features = parse_features(&features_path)?;
    let n_features_raw = features.len();
    let gene_index = build_gene_index(&features);
    let n_genes_indexed = gene_index.n_genes();

    let barcodes = parse_barcodes(&barcodes_path)?;
    let n_cells = barcodes.len();

    let meta = match meta_path {
        Some(path) => Some(load_meta(path, &barcodes)?),
        None => None,
    };

    Ok(InputBundle {
        mtx_path,
        features_path,
        barcodes_path,
        prefix,
        n_cells,
        n_features_raw,
        n_genes_indexed,
        gene_index,
        barcodes,
        meta,
    })
}

pub fn build_gene_index(features: &[Feature]) -> GeneIndex {
    let mut symbols_by_gene_id: Vec<String> = Vec::new();
    let mut symbol_to_gene_id: HashMap<String, usize> = HashMap::new();
    let mut gene_id_by_feature: Vec<Option<usize>> = Vec::with_capacity(features.len());

    for (idx, feature) in features.iter().enumerate() {
        if feature.symbol_norm.is_empty() || !feature.is_gene_expression() {
            gene_id_by_feature.push(None);
            continue;
        }
        if let Some(&existing) = symbol_to_gene_id.get(feature.symbol_norm.as_str()) {
            warn!(
                feature_index = idx,
                symbol = %feature.symbol_norm,
                "duplicate gene symbol; summing into existing gene"
            );
            gene_id_by_feature.push(Some(existing));
            continue;
        }
        let gene_id = symbols_by_gene_id.len();
        symbols_by_gene_id.push(feature.symbol_norm.clone());
        symbol_to_gene_id.insert(feature.symbol_norm.clone(), gene_id);
        gene_id_by_feature.push(Some(gene_id));
    }

    GeneIndex {
        gene_id_by_feature,
        symbols_by_gene_id,
    }
}

/// GEO deposits often prefix the three 10x files with a sample accession
/// (`GSM123_matrix.mtx.gz`); the lexicographically first prefix is used.
pub fn detect_prefix(input_dir: &Path) -> Result<Option<String>, InputError> {
    let mut prefixes = BTreeSet::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        for suffix in [
            "_matrix.mtx",
            "_matrix.mtx.gz",
            "_features.tsv",
            "_features.tsv.gz",
            "_genes.tsv",
            "_genes.tsv.gz",
            "_barcodes.tsv",
            "_barcodes.tsv.gz",
        ] {
            if let Some(prefix) = name.strip_suffix(suffix) {
                if !prefix.is_empty() {
                    prefixes.insert(prefix.to_string());
                }
            }
        }
    }
    Ok(prefixes.into_iter().next())
}

fn find_input_file(
    input_dir: &Path,
    prefix: Option<&str>,
    candidates: &[&str],
) -> Result<PathBuf, InputError> {
    for name in candidates {
        let plain = input_dir.join(name);
        if plain.exists() {
            return Ok(plain);
        }
        if let Some(p) = prefix {
            let prefixed = input_dir.join(format!("{p}_{name}"));
            if prefixed.exists() {
                return Ok(prefixed);
            }
        }
    }
    Err(InputError::MissingInput(format!(
        "none of {} found in {}",
        candidates.join(", "),
        input_dir.display()
    )))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
