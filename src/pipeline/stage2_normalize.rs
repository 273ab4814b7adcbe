use tracing::info;

use crate::expr::{LogCountsExperiment, NormalizedExperiment, ScoreInput};
use crate::input::mtx::{CscMatrix, read_mtx_csc};
use crate::input::{InputBundle, InputError};

/// Library-size normalization target for the normalized slot.
pub const NORMALIZE_SCALE: f32 = 10_000.0;

pub trait ExprAccessor {
    fn n_cells(&self) -> usize;
    fn n_genes(&self) -> usize;
    fn libsize(&self, cell: usize) -> f32;
    fn nnz(&self, cell: usize) -> u32;
}

pub struct RawCountsAccessor {
    cols: Vec<Vec<(u32, f32)>>,
    libsizes: Vec<f32>,
    nnz: Vec<u32>,
    n_genes: usize,
    scale: f32,
}

impl RawCountsAccessor {
    pub fn from_csc(csc: CscMatrix, scale: f32) -> Self {
        let (libsizes, nnz) = compute_stats(&csc);
        Self {
            n_genes: csc.n_genes,
            cols: csc.cols,
            libsizes,
            nnz,
            scale,
        }
    }

    /// Per-cell columns as `ln(1 + count / libsize * scale)`.
    pub fn normalized_columns(&self) -> Vec<Vec<(u32, f32)>> {
        self.cols
            .iter()
            .zip(&self.libsizes)
            .map(|(col, &lib)| {
                let lib = lib as f64;
                col.iter()
                    .map(|&(gene_id, count)| {
                        let value = if lib == 0.0 {
                            0.0
                        } else {
                            ((count as f64) / lib * (self.scale as f64)).ln_1p() as f32
                        };
                        (gene_id, value)
                    })
                    .collect()
            })
            .collect()
    }

    pub fn counts(&self) -> &[Vec<(u32, f32)>] {
        &self.cols
    }
}

impl ExprAccessor for RawCountsAccessor {
    fn n_cells(&self) -> usize {
        self.cols.len()
    }

    fn n_genes(&self) -> usize {
        self.n_genes
    }

    fn libsize(&self, cell: usize) -> f32 {
        self.libsizes[cell]
    }

    fn nnz(&self, cell: usize) -> u32 {
        self.nnz[cell]
    }
}

/// Which container slot the scorer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprSourceKind {
    Normalized,
    LogCounts,
}

impl ExprSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExprSourceKind::Normalized => "normalized",
            ExprSourceKind::LogCounts => "logcounts",
        }
    }
}

/// The single-cell container handed to the scorer.
#[derive(Debug, Clone)]
pub enum Experiment {
    Normalized(NormalizedExperiment),
    LogCounts(LogCountsExperiment),
}

impl Experiment {
    pub fn as_score_input(&self) -> ScoreInput<'_> {
        match self {
            Experiment::Normalized(exp) => ScoreInput::Normalized(exp),
            Experiment::LogCounts(exp) => ScoreInput::LogCounts(exp),
        }
    }
}

pub struct Stage2Output {
    pub accessor: RawCountsAccessor,
    pub experiment: Experiment,
}

pub fn build_expr_accessor(bundle: &InputBundle) -> Result<RawCountsAccessor, InputError> {
    let csc = read_mtx_csc(
        &bundle.mtx_path,
        bundle.n_features_raw,
        bundle.n_cells,
        &bundle.gene_index,
    )?;
    Ok(RawCountsAccessor::from_csc(csc, NORMALIZE_SCALE))
}

pub fn build_experiment(
    bundle: &InputBundle,
    accessor: &RawCountsAccessor,
    kind: ExprSourceKind,
) -> Experiment {
    let genes = bundle.gene_index.symbols_by_gene_id.clone();
    let cells = bundle.barcodes.clone();
    match kind {
        ExprSourceKind::Normalized => Experiment::Normalized(NormalizedExperiment {
            genes,
            cells,
            data: accessor.normalized_columns(),
        }),
        ExprSourceKind::LogCounts => Experiment::LogCounts(LogCountsExperiment {
            genes,
            cells,
            counts: accessor.counts().to_vec(),
        }),
    }
}

pub fn run_stage2(bundle: &InputBundle, kind: ExprSourceKind) -> Result<Stage2Output, InputError> {
    let accessor = build_expr_accessor(bundle)?;
    let experiment = build_experiment(bundle, &accessor, kind);
    let n_empty = (0..accessor.n_cells())
        .filter(|&cell| accessor.nnz(cell) == 0)
        .count();
    info!(
        source = kind.as_str(),
        n_cells = accessor.n_cells(),
        n_genes = accessor.n_genes(),
        n_empty_cells = n_empty,
        "stage2 expression container ready"
    );
    Ok(Stage2Output {
        accessor,
        experiment,
    })
}

fn compute_stats(csc: &CscMatrix) -> (Vec<f32>, Vec<u32>) {
    let mut libsizes = Vec::with_capacity(csc.n_cols);
    let mut nnz = Vec::with_capacity(csc.n_cols);
    for col in &csc.cols {
        let mut sum = 0f64;
        for &(_, v) in col {
            sum += v as f64;
        }
        libsizes.push(sum as f32);
        nnz.push(col.len() as u32);
    }
    (libsizes, nnz)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_normalize.rs"]
mod tests;
