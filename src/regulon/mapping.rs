use std::collections::HashMap;

use crate::input::features::normalize_symbol;
use crate::regulon::Regulon;

/// How much of one TF's regulon is measurable in the expression data.
#[derive(Debug, Clone, PartialEq)]
pub struct RegulonAudit {
    pub tf: String,
    pub n_targets: usize,
    pub n_mappable: usize,
    pub missing_targets: Vec<String>,
}

/// Symbol lookup shared by the audit and the scorer: keys are normalized
/// the same way as 10x feature symbols.
pub fn build_symbol_map<'a, I>(genes: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map = HashMap::new();
    for (idx, gene) in genes.into_iter().enumerate() {
        map.entry(normalize_symbol(gene)).or_insert(idx);
    }
    map
}

pub fn map_symbol(symbol: &str, symbol_map: &HashMap<String, usize>) -> Option<usize> {
    symbol_map.get(&normalize_symbol(symbol)).copied()
}

pub fn audit_regulon(regulon: &Regulon, symbol_map: &HashMap<String, usize>) -> Vec<RegulonAudit> {
    regulon
        .iter()
        .map(|(tf, profile)| {
            let missing_targets: Vec<String> = profile
                .targets()
                .iter()
                .filter(|t| map_symbol(t, symbol_map).is_none())
                .cloned()
                .collect();
            RegulonAudit {
                tf: tf.to_string(),
                n_targets: profile.len(),
                n_mappable: profile.len() - missing_targets.len(),
                missing_targets,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/regulon/mapping.rs"]
mod tests;
