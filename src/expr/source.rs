use std::borrow::Cow;

use crate::expr::ExprMatrix;
use crate::viper::ScoreError;

/// Anything that can hand the scorer a normalized genes × cells matrix.
pub trait ExpressionSource {
    fn as_expression_matrix(&self) -> Result<ExprMatrix, ScoreError>;
}

/// Single-cell container whose normalized slot holds log-normalized
/// values per cell, stored as sparse columns.
#[derive(Debug, Clone)]
pub struct NormalizedExperiment {
    pub genes: Vec<String>,
    pub cells: Vec<String>,
    pub data: Vec<Vec<(u32, f32)>>,
}

impl ExpressionSource for NormalizedExperiment {
    fn as_expression_matrix(&self) -> Result<ExprMatrix, ScoreError> {
        ExprMatrix::from_sparse_columns(self.genes.clone(), self.cells.clone(), &self.data)
    }
}

/// Single-cell container that keeps raw counts and derives a log-counts
/// slot from library-size factors centred at one.
#[derive(Debug, Clone)]
pub struct LogCountsExperiment {
    pub genes: Vec<String>,
    pub cells: Vec<String>,
    pub counts: Vec<Vec<(u32, f32)>>,
}

impl LogCountsExperiment {
    /// Library size of each cell divided by the mean library size over
    /// cells with at least one count.
    pub fn size_factors(&self) -> Vec<f64> {
        let libsizes: Vec<f64> = self
            .counts
            .iter()
            .map(|col| col.iter().map(|&(_, v)| v as f64).sum())
            .collect();
        let nonzero: Vec<f64> = libsizes.iter().copied().filter(|&l| l > 0.0).collect();
        if nonzero.is_empty() {
            return vec![0.0; libsizes.len()];
        }
        let mean = nonzero.iter().sum::<f64>() / nonzero.len() as f64;
        libsizes.iter().map(|&l| l / mean).collect()
    }

    /// `log2(count / size_factor + 1)`; cells without counts stay at zero.
    pub fn logcounts(&self) -> Vec<Vec<(u32, f32)>> {
        let factors = self.size_factors();
        self.counts
            .iter()
            .zip(factors)
            .map(|(col, sf)| {
                if sf <= 0.0 {
                    return col.iter().map(|&(g, _)| (g, 0.0)).collect();
                }
                col.iter()
                    .map(|&(g, v)| (g, ((v as f64) / sf + 1.0).log2() as f32))
                    .collect()
            })
            .collect()
    }
}

impl ExpressionSource for LogCountsExperiment {
    fn as_expression_matrix(&self) -> Result<ExprMatrix, ScoreError> {
        ExprMatrix::from_sparse_columns(self.genes.clone(), self.cells.clone(), &self.logcounts())
    }
}

impl ExpressionSource for ExprMatrix {
    fn as_expression_matrix(&self) -> Result<ExprMatrix, ScoreError> {
        Ok(self.clone())
    }
}

/// The three input shapes accepted by the scorer.
#[derive(Debug, Clone, Copy)]
pub enum ScoreInput<'a> {
    Normalized(&'a NormalizedExperiment),
    LogCounts(&'a LogCountsExperiment),
    Matrix(&'a ExprMatrix),
}

impl<'a> ScoreInput<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreInput::Normalized(_) => "normalized",
            ScoreInput::LogCounts(_) => "logcounts",
            ScoreInput::Matrix(_) => "matrix",
        }
    }

    /// A plain matrix is borrowed as-is; containers materialize their slot.
    pub fn resolve(&self) -> Result<Cow<'a, ExprMatrix>, ScoreError> {
        match *self {
            ScoreInput::Normalized(exp) => exp.as_expression_matrix().map(Cow::Owned),
            ScoreInput::LogCounts(exp) => exp.as_expression_matrix().map(Cow::Owned),
            ScoreInput::Matrix(m) => Ok(Cow::Borrowed(m)),
        }
    }
}
