use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::info;

use crate::viper::{ActivityMatrix, ScoreError};

/// Mean TF activity per cell cluster and the TFs that vary most between
/// clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterActivity {
    pub clusters: Vec<String>,
    pub cluster_sizes: Vec<usize>,
    pub tfs: Vec<String>,
    /// `means[tf][cluster]`; NaN when the cluster has no finite score.
    pub means: Vec<Vec<f32>>,
    /// Sample variance of each TF's finite cluster means.
    pub variance: Vec<f32>,
    /// TF indices, highest variance first, at most `top_n` long.
    pub top: Vec<usize>,
}

impl ClusterActivity {
    pub fn top_tf_names(&self) -> Vec<&str> {
        self.top.iter().map(|&i| self.tfs[i].as_str()).collect()
    }
}

pub fn run_stage5(
    activity: &ActivityMatrix,
    labels: &[String],
    top_n: usize,
) -> Result<ClusterActivity, ScoreError> {
    let n_cells = activity.cell_names().len();
    if labels.len() != n_cells {
        return Err(ScoreError::Shape(format!(
            "{} cluster labels for {} cells",
            labels.len(),
            n_cells
        )));
    }

    let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (cell, label) in labels.iter().enumerate() {
        members.entry(label.as_str()).or_default().push(cell);
    }
    let clusters: Vec<String> = members.keys().map(|k| k.to_string()).collect();
    let cluster_sizes: Vec<usize> = members.values().map(Vec::len).collect();

    let tfs = activity.tf_names().to_vec();
    let mut means = Vec::with_capacity(tfs.len());
    let mut variance = Vec::with_capacity(tfs.len());
    for tf in 0..tfs.len() {
        let scores = activity.tf_scores(tf);
        let row: Vec<f32> = members
            .values()
            .map(|cells| finite_mean(cells.iter().map(|&c| scores[c])))
            .collect();
        variance.push(sample_variance(&row));
        means.push(row);
    }

    let mut order: Vec<usize> = (0..tfs.len()).collect();
    order.sort_by(|&a, &b| {
        compare_variance_desc(variance[a], variance[b]).then_with(|| tfs[a].cmp(&tfs[b]))
    });
    order.truncate(top_n);

    info!(
        n_clusters = clusters.len(),
        n_tfs = tfs.len(),
        n_top = order.len(),
        "stage5 cluster activity summarized"
    );

    Ok(ClusterActivity {
        clusters,
        cluster_sizes,
        tfs,
        means,
        variance,
        top: order,
    })
}

fn finite_mean(values: impl Iterator<Item = f32>) -> f32 {
    let mut sum = 0f64;
    let mut n = 0usize;
    for v in values.filter(|v| v.is_finite()) {
        sum += v as f64;
        n += 1;
    }
    if n == 0 {
        f32::NAN
    } else {
        (sum / n as f64) as f32
    }
}

fn sample_variance(values: &[f32]) -> f32 {
    let finite: Vec<f64> = values
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as f64)
        .collect();
    if finite.len() < 2 {
        return f32::NAN;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    let ss: f64 = finite.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (finite.len() - 1) as f64) as f32
}

// NaN sorts after every number.
fn compare_variance_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_clusters.rs"]
mod tests;
