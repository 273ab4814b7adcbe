use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use crate::input::gz::open_maybe_gz;
use crate::input::{GeneIndex, InputError};

/// Per-cell sparse counts keyed by gene id, each column sorted by gene.
#[derive(Debug, Clone)]
pub struct CscMatrix {
    pub n_genes: usize,
    pub n_cols: usize,
    pub cols: Vec<Vec<(u32, f32)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueField {
    Integer,
    Real,
}

pub fn read_mtx_csc(
    path: &Path,
    n_features_raw: usize,
    n_cells: usize,
    gene_index: &GeneIndex,
) -> Result<CscMatrix, InputError> {
    let mut lines = open_maybe_gz(path)?.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(InputError::Parse("matrix.mtx is empty".to_string())),
    };
    let field = parse_header(header.trim_end())?;

    let mut line_no = 1usize;
    let (rows, cols) = loop {
        let Some(line) = lines.next() else {
            return Err(InputError::Parse("missing matrix size line".to_string()));
        };
        let line = line?;
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let dims: Vec<usize> = line
            .split_whitespace()
            .map(|t| t.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| InputError::Parse("invalid matrix size line".to_string()))?;
        if dims.len() != 3 {
            return Err(InputError::Parse("invalid matrix size line".to_string()));
        }
        break (dims[0], dims[1]);
    };

    if rows != n_features_raw {
        return Err(InputError::InvalidInput(format!(
            "matrix row count {rows} does not match features {n_features_raw}"
        )));
    }
    if cols != n_cells {
        return Err(InputError::InvalidInput(format!(
            "matrix column count {cols} does not match barcodes {n_cells}"
        )));
    }

    let mut per_col: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); cols];

    for line in lines {
        let line = line?;
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(row_raw), Some(col_raw), Some(val_raw)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(InputError::Parse(format!(
                "invalid matrix entry at line {line_no}"
            )));
        };
        let row: usize = row_raw
            .parse()
            .map_err(|_| InputError::Parse(format!("invalid row index at line {line_no}")))?;
        let col: usize = col_raw
            .parse()
            .map_err(|_| InputError::Parse(format!("invalid col index at line {line_no}")))?;
        let val = parse_value(val_raw, field)
            .ok_or_else(|| InputError::Parse(format!("invalid value at line {line_no}")))?;
        if row == 0 || row > rows || col == 0 || col > cols {
            return Err(InputError::Parse(format!(
                "matrix entry out of bounds at line {line_no}"
            )));
        }
        if val == 0.0 {
            continue;
        }
        if let Some(gene_id) = gene_index.gene_id_by_feature.get(row - 1).and_then(|v| *v) {
            *per_col[col - 1].entry(gene_id as u32).or_insert(0.0) += val;
        }
    }

    let cols_vec = per_col
        .into_iter()
        .map(|map| map.into_iter().map(|(g, v)| (g, v as f32)).collect())
        .collect();

    Ok(CscMatrix {
        n_genes: gene_index.n_genes(),
        n_cols: cols,
        cols: cols_vec,
    })
}

fn parse_header(header: &str) -> Result<ValueField, InputError> {
    if !header.starts_with("%%MatrixMarket") {
        return Err(InputError::Parse("missing MatrixMarket header".to_string()));
    }
    let lower = header.to_ascii_lowercase();
    if !lower.contains("coordinate") {
        return Err(InputError::InvalidInput(
            "only coordinate MatrixMarket files are supported".to_string(),
        ));
    }
    if lower.contains("real") || lower.contains("double") {
        Ok(ValueField::Real)
    } else {
        Ok(ValueField::Integer)
    }
}

fn parse_value(raw: &str, field: ValueField) -> Option<f64> {
    match field {
        ValueField::Integer => raw.parse::<i64>().ok().map(|v| v as f64),
        ValueField::Real => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}
