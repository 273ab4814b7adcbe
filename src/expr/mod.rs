pub mod source;

pub use source::{ExpressionSource, LogCountsExperiment, NormalizedExperiment, ScoreInput};

use crate::viper::ScoreError;

/// Dense genes × cells matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMatrix {
    genes: Vec<String>,
    cells: Vec<String>,
    values: Vec<f32>,
}

impl ExprMatrix {
    pub fn new(genes: Vec<String>, cells: Vec<String>, values: Vec<f32>) -> Result<Self, ScoreError> {
        if values.len() != genes.len() * cells.len() {
            return Err(ScoreError::Shape(format!(
                "{} values for {} genes x {} cells",
                values.len(),
                genes.len(),
                cells.len()
            )));
        }
        Ok(Self {
            genes,
            cells,
            values,
        })
    }

    pub fn from_rows(
        genes: Vec<String>,
        cells: Vec<String>,
        rows: &[Vec<f32>],
    ) -> Result<Self, ScoreError> {
        if rows.iter().any(|r| r.len() != cells.len()) {
            return Err(ScoreError::Shape(format!(
                "every row must have {} values",
                cells.len()
            )));
        }
        let values = rows.iter().flatten().copied().collect();
        Self::new(genes, cells, values)
    }

    /// Scatters per-cell sparse columns into a dense matrix.
    pub fn from_sparse_columns(
        genes: Vec<String>,
        cells: Vec<String>,
        columns: &[Vec<(u32, f32)>],
    ) -> Result<Self, ScoreError> {
        if columns.len() != cells.len() {
            return Err(ScoreError::Shape(format!(
                "{} columns for {} cells",
                columns.len(),
                cells.len()
            )));
        }
        let n_genes = genes.len();
        let n_cells = cells.len();
        let mut values = vec![0f32; n_genes * n_cells];
        for (cell, column) in columns.iter().enumerate() {
            for &(gene, value) in column {
                let gene = gene as usize;
                if gene >= n_genes {
                    return Err(ScoreError::Shape(format!(
                        "gene id {gene} out of range for {n_genes} genes"
                    )));
                }
                values[gene * n_cells + cell] = value;
            }
        }
        Self::new(genes, cells, values)
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn row(&self, gene: usize) -> &[f32] {
        let n = self.cells.len();
        &self.values[gene * n..(gene + 1) * n]
    }

    pub fn get(&self, gene: usize, cell: usize) -> f32 {
        self.values[gene * self.cells.len() + cell]
    }

    pub fn size_bytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<f32>()
    }

    /// First non-finite entry, as (gene, cell).
    pub fn find_non_finite(&self) -> Option<(usize, usize)> {
        let n = self.cells.len();
        self.values
            .iter()
            .position(|v| !v.is_finite())
            .map(|idx| (idx / n, idx % n))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/expr/tests.rs"]
mod tests;
