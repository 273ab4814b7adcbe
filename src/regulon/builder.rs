use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::regulon::{ConfidenceFilter, InteractionRecord, Regulon, TfProfile};

/// Keeps rows whose tier is in `filter`, preserving input order.
pub fn filter_by_confidence<'a>(
    records: &'a [InteractionRecord],
    filter: &ConfidenceFilter,
) -> Vec<&'a InteractionRecord> {
    records
        .iter()
        .filter(|r| filter.allows(r.confidence))
        .collect()
}

/// Groups interaction rows by TF. A repeated (tf, target) pair overwrites
/// the earlier `mor` and `likelihood` but keeps the target's position.
pub fn build_regulon<'a, I>(records: I) -> Regulon
where
    I: IntoIterator<Item = &'a InteractionRecord>,
{
    let mut profiles: BTreeMap<String, TfProfile> = BTreeMap::new();
    let mut n_rows = 0usize;
    let mut n_overwritten = 0usize;

    for record in records {
        n_rows += 1;
        let profile = profiles.entry(record.tf.clone()).or_default();
        if profile.upsert(&record.target, record.mor, record.likelihood) {
            n_overwritten += 1;
            warn!(
                tf = %record.tf,
                target = %record.target,
                "duplicate interaction; later row replaces earlier one"
            );
        }
    }

    info!(
        n_rows,
        n_tfs = profiles.len(),
        n_overwritten,
        "regulon built"
    );
    Regulon::from_profiles(profiles)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegulonSummaryRow {
    pub tf: String,
    pub n_targets: usize,
    pub n_activating: usize,
    pub n_repressing: usize,
    pub likelihood_sum: f32,
}

pub fn summarize_regulon(regulon: &Regulon) -> Vec<RegulonSummaryRow> {
    regulon
        .iter()
        .map(|(tf, profile)| RegulonSummaryRow {
            tf: tf.to_string(),
            n_targets: profile.len(),
            n_activating: profile.mor().iter().filter(|&&m| m > 0.0).count(),
            n_repressing: profile.mor().iter().filter(|&&m| m < 0.0).count(),
            likelihood_sum: profile.likelihood().iter().sum(),
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/regulon/builder.rs"]
mod tests;
