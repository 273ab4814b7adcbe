use crate::expr::ExprMatrix;
use crate::viper::SignatureMethod;
use crate::viper::stats::{average_ranks, mad, mean, median, sample_sd};

/// Gene-level signature restricted to genes with a finite row.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Row index into the source matrix for every kept gene.
    pub source_rows: Vec<usize>,
    pub n_cells: usize,
    values: Vec<f64>,
}

impl Signature {
    pub fn n_genes(&self) -> usize {
        self.source_rows.len()
    }

    pub fn get(&self, gene: usize, cell: usize) -> f64 {
        self.values[gene * self.n_cells + cell]
    }

    /// Signature values of one cell across all kept genes.
    pub fn column(&self, cell: usize) -> Vec<f64> {
        (0..self.n_genes()).map(|g| self.get(g, cell)).collect()
    }

    /// Keeps only the kept genes for which `keep(source_row)` holds.
    pub fn retain_rows(&mut self, keep: impl Fn(usize) -> bool) {
        let n = self.n_cells;
        let mut rows = Vec::new();
        let mut values = Vec::new();
        for (g, &src) in self.source_rows.iter().enumerate() {
            if keep(src) {
                rows.push(src);
                values.extend_from_slice(&self.values[g * n..(g + 1) * n]);
            }
        }
        self.source_rows = rows;
        self.values = values;
    }
}

pub fn compute_signature(matrix: &ExprMatrix, method: SignatureMethod) -> Signature {
    let n_cells = matrix.n_cells();
    let mut source_rows = Vec::with_capacity(matrix.n_genes());
    let mut values = Vec::with_capacity(matrix.n_genes() * n_cells);

    for gene in 0..matrix.n_genes() {
        let row: Vec<f64> = matrix.row(gene).iter().map(|&v| v as f64).collect();
        let transformed = transform_row(&row, method);
        if transformed.iter().all(|v| v.is_finite()) {
            source_rows.push(gene);
            values.extend(transformed);
        }
    }

    Signature {
        source_rows,
        n_cells,
        values,
    }
}

fn transform_row(row: &[f64], method: SignatureMethod) -> Vec<f64> {
    match method {
        SignatureMethod::None => row.to_vec(),
        SignatureMethod::Scale => {
            let m = mean(row);
            let sd = sample_sd(row);
            row.iter().map(|v| (v - m) / sd).collect()
        }
        SignatureMethod::Mad => {
            let m = median(row);
            let spread = mad(row);
            row.iter().map(|v| (v - m) / spread).collect()
        }
        SignatureMethod::Rank => {
            let centre = (row.len() as f64 + 1.0) / 2.0;
            average_ranks(row).into_iter().map(|r| r - centre).collect()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/viper/signature.rs"]
mod tests;
