use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::warn;

use crate::input::InputError;
use crate::input::gz::open_maybe_gz;

/// Per-cell annotation table aligned to the barcode order of the matrix.
#[derive(Debug, Clone)]
pub struct CellMeta {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CellMeta {
    pub fn column(&self, name: &str) -> Option<Vec<String>> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).cloned().unwrap_or_default())
                .collect(),
        )
    }
}

pub fn load_meta(path: &Path, barcodes: &[String]) -> Result<CellMeta, InputError> {
    let mut lines = open_maybe_gz(path)?.lines();

    let header_line = match lines.next() {
        Some(line) => line?,
        None => return Err(InputError::Parse("meta file is empty".to_string())),
    };
    let header_cols: Vec<String> = header_line
        .trim_end()
        .split('\t')
        .map(|s| s.trim().to_string())
        .collect();

    let barcode_col = header_cols
        .iter()
        .position(|name| {
            let lower = name.to_ascii_lowercase();
            lower == "barcode" || lower == "barcodes"
        })
        .unwrap_or(0);

    let columns: Vec<String> = header_cols
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != barcode_col)
        .map(|(_, name)| name.clone())
        .collect();

    let mut by_barcode: HashMap<String, Vec<String>> = HashMap::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line_no = idx + 2;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let Some(barcode) = fields.get(barcode_col).map(|s| s.trim()) else {
            warn!(line = line_no, "meta line has no barcode column; skipping");
            continue;
        };
        if barcode.is_empty() {
            warn!(line = line_no, "meta line has empty barcode; skipping");
            continue;
        }
        if by_barcode.contains_key(barcode) {
            warn!(line = line_no, barcode, "duplicate barcode in metadata; keeping first");
            continue;
        }
        let row = (0..header_cols.len())
            .filter(|&i| i != barcode_col)
            .map(|i| fields.get(i).map(|s| s.trim()).unwrap_or("").to_string())
            .collect();
        by_barcode.insert(barcode.to_string(), row);
    }

    let rows = barcodes
        .iter()
        .map(|bc| {
            by_barcode
                .get(bc)
                .cloned()
                .unwrap_or_else(|| vec![String::new(); columns.len()])
        })
        .collect();

    Ok(CellMeta { columns, rows })
}
