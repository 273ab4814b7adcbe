use std::collections::{HashMap, HashSet};

use crate::regulon::mapping::map_symbol;
use crate::regulon::Regulon;
use crate::viper::stats::{average_ranks, qnorm};

/// A TF regulon resolved against the signature genes.
#[derive(Debug, Clone)]
pub struct TfSet {
    pub name: String,
    pub rows: Vec<usize>,
    pub mor: Vec<f64>,
    pub weights: Vec<f64>,
    /// sqrt of the summed squared weights; zero when no weight is positive.
    pub norm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedTf {
    pub name: String,
    pub n_found: usize,
}

/// Maps every TF's targets onto signature rows and drops TFs left with
/// fewer than `minsize` targets.
pub fn prepare_tf_sets(
    regulon: &Regulon,
    gene_map: &HashMap<String, usize>,
    minsize: usize,
) -> (Vec<TfSet>, Vec<DroppedTf>) {
    let mut kept = Vec::new();
    let mut dropped = Vec::new();

    for (name, profile) in regulon.iter() {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        let mut mor = Vec::new();
        let mut likelihood = Vec::new();
        for ((target, &m), &lik) in profile
            .targets()
            .iter()
            .zip(profile.mor())
            .zip(profile.likelihood())
        {
            let Some(row) = map_symbol(target, gene_map) else {
                continue;
            };
            if !seen.insert(row) {
                continue;
            }
            rows.push(row);
            mor.push(m as f64);
            likelihood.push(lik as f64);
        }

        if rows.len() < minsize {
            dropped.push(DroppedTf {
                name: name.to_string(),
                n_found: rows.len(),
            });
            continue;
        }

        let weights = normalize_weights(&likelihood);
        let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        kept.push(TfSet {
            name: name.to_string(),
            rows,
            mor,
            weights,
            norm,
        });
    }

    (kept, dropped)
}

/// Likelihoods scaled to a maximum of one, then to a sum of one.
fn normalize_weights(likelihood: &[f64]) -> Vec<f64> {
    let max = likelihood.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_nan() || max <= 0.0 {
        return vec![0.0; likelihood.len()];
    }
    let scaled: Vec<f64> = likelihood.iter().map(|l| (l / max).max(0.0)).collect();
    let total: f64 = scaled.iter().sum();
    scaled.iter().map(|w| w / total).collect()
}

/// Rank quantiles `rank / (n + 1)` of one cell's signature over genes.
pub fn rank_quantiles(signature: &[f64]) -> Vec<f64> {
    let n = signature.len() as f64;
    average_ranks(signature)
        .into_iter()
        .map(|r| r / (n + 1.0))
        .collect()
}

/// Offset added to the one-tailed quantiles, taken from the largest
/// `|t2 - 0.5| * 2` over every cell of the run.
pub fn one_tail_shift(quantiles: &[Vec<f64>]) -> f64 {
    let t1_max = quantiles
        .iter()
        .flatten()
        .map(|p| (p - 0.5).abs() * 2.0)
        .fold(0.0, f64::max);
    (1.0 - t1_max) / 2.0
}

/// Normalized enrichment scores of every TF set for one cell, given its
/// rank quantiles and the run-wide one-tailed shift.
pub fn area_cell(t2: &[f64], shift: f64, sets: &[TfSet]) -> Vec<f32> {
    // two-tailed (signed) and one-tailed (absolute) normal scores
    let z2: Vec<f64> = t2.iter().map(|&p| qnorm(p)).collect();
    let z1: Vec<f64> = t2
        .iter()
        .map(|&p| qnorm((p - 0.5).abs() * 2.0 + shift))
        .collect();

    sets.iter().map(|set| nes(set, &z1, &z2)).collect()
}

fn nes(set: &TfSet, z1: &[f64], z2: &[f64]) -> f32 {
    if set.norm <= 0.0 {
        return f32::NAN;
    }
    let mut sum1 = 0f64;
    let mut sum2 = 0f64;
    for ((&row, &mor), &w) in set.rows.iter().zip(&set.mor).zip(&set.weights) {
        sum1 += mor * w * z2[row];
        sum2 += (1.0 - mor.abs()) * w * z1[row];
    }
    let sign = if sum1 < 0.0 { -1.0 } else { 1.0 };
    let es = (sum1.abs() + sum2.max(0.0)) * sign;
    (es / set.norm) as f32
}

#[cfg(test)]
#[path = "../../tests/src_inline/viper/area.rs"]
mod tests;
