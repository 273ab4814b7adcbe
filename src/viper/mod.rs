//! Regulon enrichment scoring (analytic rank-based enrichment, aREA).
//!
//! Every cell's signature is ranked over genes and each TF's targets are
//! tested for a coordinated shift in the direction given by their mode of
//! regulation, weighted by interaction likelihood. The result is a
//! normalized enrichment score per TF and cell.

use std::collections::HashSet;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::expr::ScoreInput;
use crate::input::features::normalize_symbol;
use crate::regulon::Regulon;
use crate::regulon::mapping::build_symbol_map;

pub mod area;
pub mod options;
pub mod signature;
pub mod stats;

pub use options::{ParallelConfig, ScoreOptions, SignatureMethod};

use area::{TfSet, area_cell, one_tail_shift, prepare_tf_sets, rank_quantiles};
use signature::{Signature, compute_signature};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("expression matrix shape error: {0}")]
    Shape(String),
    #[error("expression matrix has no genes or no cells")]
    EmptyExpression,
    #[error("non-finite expression value for gene {gene} in cell {cell}")]
    NonFinite { gene: String, cell: String },
    #[error("no regulon has at least {minsize} targets in the expression data")]
    EmptyRegulon { minsize: usize },
    #[error("option '{0}' names a structural argument and cannot be overridden")]
    StructuralOption(String),
    #[error("unknown scoring option '{0}'")]
    UnknownOption(String),
    #[error("invalid value '{value}' for scoring option '{key}'")]
    InvalidOption { key: String, value: String },
    #[error(
        "expression matrix of {size_bytes} bytes exceeds the parallel globals allowance of {limit_bytes} bytes"
    )]
    GlobalsTooLarge { size_bytes: usize, limit_bytes: usize },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    TfsByCells,
    CellsByTfs,
}

/// Activity scores, TFs × cells unless transposed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityMatrix {
    row_names: Vec<String>,
    col_names: Vec<String>,
    values: Vec<f32>,
    orientation: Orientation,
}

impl ActivityMatrix {
    pub fn new(tfs: Vec<String>, cells: Vec<String>, values: Vec<f32>) -> Result<Self, ScoreError> {
        if values.len() != tfs.len() * cells.len() {
            return Err(ScoreError::Shape(format!(
                "{} scores for {} TFs x {} cells",
                values.len(),
                tfs.len(),
                cells.len()
            )));
        }
        Ok(Self {
            row_names: tfs,
            col_names: cells,
            values,
            orientation: Orientation::TfsByCells,
        })
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn n_rows(&self) -> usize {
        self.row_names.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_names.len()
    }

    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn row(&self, idx: usize) -> &[f32] {
        let n = self.col_names.len();
        &self.values[idx * n..(idx + 1) * n]
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.col_names.len() + col]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn tf_names(&self) -> &[String] {
        match self.orientation {
            Orientation::TfsByCells => &self.row_names,
            Orientation::CellsByTfs => &self.col_names,
        }
    }

    pub fn cell_names(&self) -> &[String] {
        match self.orientation {
            Orientation::TfsByCells => &self.col_names,
            Orientation::CellsByTfs => &self.row_names,
        }
    }

    /// Scores of one TF across cells, whatever the orientation.
    pub fn tf_scores(&self, tf: usize) -> Vec<f32> {
        match self.orientation {
            Orientation::TfsByCells => self.row(tf).to_vec(),
            Orientation::CellsByTfs => (0..self.n_rows()).map(|c| self.get(c, tf)).collect(),
        }
    }

    pub fn transpose(&self) -> ActivityMatrix {
        let (n_rows, n_cols) = (self.n_rows(), self.n_cols());
        let mut values = vec![0f32; self.values.len()];
        for r in 0..n_rows {
            for c in 0..n_cols {
                values[c * n_rows + r] = self.values[r * n_cols + c];
            }
        }
        ActivityMatrix {
            row_names: self.col_names.clone(),
            col_names: self.row_names.clone(),
            values,
            orientation: match self.orientation {
                Orientation::TfsByCells => Orientation::CellsByTfs,
                Orientation::CellsByTfs => Orientation::TfsByCells,
            },
        }
    }
}

fn progress(verbose: bool, step: &'static str, detail: &str) {
    if verbose {
        info!(step, detail, "viper");
    } else {
        debug!(step, detail, "viper");
    }
}

/// Scores TF activity per cell. The expression matrix always comes from
/// `input` and the regulon from `regulon`; `options` only tunes the run.
pub fn score_activity(
    input: ScoreInput<'_>,
    regulon: &Regulon,
    options: &ScoreOptions,
    parallel: &ParallelConfig,
) -> Result<ActivityMatrix, ScoreError> {
    options.validate()?;
    let matrix = input.resolve()?;
    progress(
        options.verbose,
        "resolve",
        &format!(
            "{} input: {} genes x {} cells",
            input.kind(),
            matrix.n_genes(),
            matrix.n_cells()
        ),
    );
    if matrix.n_genes() == 0 || matrix.n_cells() == 0 {
        return Err(ScoreError::EmptyExpression);
    }
    if let Some((gene, cell)) = matrix.find_non_finite() {
        return Err(ScoreError::NonFinite {
            gene: matrix.genes()[gene].clone(),
            cell: matrix.cells()[cell].clone(),
        });
    }

    let mut signature = compute_signature(&matrix, options.method);
    progress(
        options.verbose,
        "signature",
        &format!(
            "method={}, dropped {} genes without a finite signature",
            options.method,
            matrix.n_genes() - signature.n_genes()
        ),
    );

    if options.eset_filter {
        // TF names count as regulon features alongside their targets
        let universe: HashSet<String> = regulon
            .target_universe()
            .into_iter()
            .chain(regulon.tf_names())
            .map(normalize_symbol)
            .collect();
        signature.retain_rows(|row| universe.contains(&normalize_symbol(&matrix.genes()[row])));
        progress(
            options.verbose,
            "eset.filter",
            &format!("{} genes remain", signature.n_genes()),
        );
    }

    let gene_map = build_symbol_map(
        signature
            .source_rows
            .iter()
            .map(|&row| matrix.genes()[row].as_str()),
    );
    let (sets, dropped) = prepare_tf_sets(regulon, &gene_map, options.minsize);
    progress(
        options.verbose,
        "regulon",
        &format!(
            "{} TFs scored, {} below minsize {}",
            sets.len(),
            dropped.len(),
            options.minsize
        ),
    );
    for tf in &dropped {
        debug!(tf = %tf.name, n_found = tf.n_found, "regulon below minsize");
    }
    if sets.is_empty() {
        return Err(ScoreError::EmptyRegulon {
            minsize: options.minsize,
        });
    }

    let per_cell = run_cells(&signature, &sets, options.cores, matrix.size_bytes(), parallel)?;

    let n_cells = matrix.n_cells();
    let mut values = vec![0f32; sets.len() * n_cells];
    for (cell, scores) in per_cell.iter().enumerate() {
        for (tf, &score) in scores.iter().enumerate() {
            values[tf * n_cells + cell] = score;
        }
    }
    let tfs = sets.into_iter().map(|s| s.name).collect();
    ActivityMatrix::new(tfs, matrix.cells().to_vec(), values)
}

fn run_cells(
    signature: &Signature,
    sets: &[TfSet],
    cores: usize,
    size_bytes: usize,
    parallel: &ParallelConfig,
) -> Result<Vec<Vec<f32>>, ScoreError> {
    let n_cells = signature.n_cells;
    if cores <= 1 {
        let quantiles: Vec<Vec<f64>> = (0..n_cells)
            .map(|cell| rank_quantiles(&signature.column(cell)))
            .collect();
        let shift = one_tail_shift(&quantiles);
        return Ok(quantiles.iter().map(|q| area_cell(q, shift, sets)).collect());
    }

    if size_bytes > parallel.max_globals_bytes {
        return Err(ScoreError::GlobalsTooLarge {
            size_bytes,
            limit_bytes: parallel.max_globals_bytes,
        });
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(cores).build()?;
    debug!(threads = pool.current_num_threads(), "viper worker pool ready");
    Ok(pool.install(|| {
        let quantiles: Vec<Vec<f64>> = (0..n_cells)
            .into_par_iter()
            .map(|cell| rank_quantiles(&signature.column(cell)))
            .collect();
        let shift = one_tail_shift(&quantiles);
        quantiles
            .par_iter()
            .map(|q| area_cell(q, shift, sets))
            .collect()
    }))
}

#[cfg(test)]
#[path = "../../tests/src_inline/viper/tests.rs"]
mod tests;
