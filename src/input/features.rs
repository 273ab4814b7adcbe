use std::io::BufRead;
use std::path::Path;

use tracing::warn;

use crate::input::InputError;
use crate::input::gz::open_maybe_gz;

#[derive(Debug, Clone)]
pub struct Feature {
    pub symbol_norm: String,
    pub feature_type: Option<String>,
}

impl Feature {
    /// Antibody capture and CRISPR guide rows of multimodal 10x runs are not genes.
    pub fn is_gene_expression(&self) -> bool {
        match &self.feature_type {
            None => true,
            Some(t) => t == "Gene Expression",
        }
    }
}

pub fn parse_features(path: &Path) -> Result<Vec<Feature>, InputError> {
    let reader = open_maybe_gz(path)?;
    let mut features = Vec::new();
    let mut first_width: Option<usize> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 2 {
            return Err(InputError::Parse(format!(
                "features line {line_no} has <2 columns"
            )));
        }
        match first_width {
            None => first_width = Some(cols.len()),
            Some(2) if cols.len() >= 3 => {
                warn!(line = line_no, "features file switches from v2 to v3 layout");
            }
            Some(_) => {}
        }
        features.push(Feature {
            symbol_norm: normalize_symbol(cols[1]),
            feature_type: cols.get(2).map(|s| s.trim().to_string()),
        });
    }

    if features.is_empty() {
        return Err(InputError::Parse("features file is empty".to_string()));
    }
    Ok(features)
}

/// Upper-cases symbols and strips Ensembl version suffixes so that human
/// and mouse regulon symbols meet the matrix symbols on the same key.
pub fn normalize_symbol(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let upper = trimmed.to_ascii_uppercase();
    if let Some((left, right)) = upper.rsplit_once('.') {
        if left.starts_with("ENS") && right.chars().all(|c| c.is_ascii_digit()) {
            return left.to_string();
        }
    }
    upper
}
