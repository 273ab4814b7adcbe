use super::*;
use crate::regulon::mapping::build_symbol_map;
use crate::regulon::{InteractionRecord, build_regulon};

fn record(tf: &str, target: &str, mor: f32, likelihood: f32) -> InteractionRecord {
    InteractionRecord {
        tf: tf.to_string(),
        target: target.to_string(),
        mor,
        confidence: None,
        likelihood,
    }
}

fn genes(n: usize) -> Vec<String> {
    (0..n).map(|g| format!("G{g}")).collect()
}

fn score_single(signature: &[f64], sets: &[TfSet]) -> Vec<f32> {
    let quantiles = rank_quantiles(signature);
    let shift = one_tail_shift(std::slice::from_ref(&quantiles));
    area_cell(&quantiles, shift, sets)
}

fn sets_for(records: &[InteractionRecord], n_genes: usize, minsize: usize) -> Vec<TfSet> {
    let names = genes(n_genes);
    let map = build_symbol_map(names.iter().map(String::as_str));
    let (sets, _) = prepare_tf_sets(&build_regulon(records), &map, minsize);
    sets
}

#[test]
fn test_prepare_weights_sum_to_one() {
    let records = vec![
        record("TF1", "G0", 1.0, 1.0),
        record("TF1", "G1", 1.0, 0.5),
        record("TF1", "G2", -1.0, 0.5),
    ];
    let sets = sets_for(&records, 5, 1);
    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    assert_eq!(set.rows, vec![0, 1, 2]);
    assert_eq!(set.mor, vec![1.0, 1.0, -1.0]);
    assert!((set.weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    assert!((set.weights[0] - 0.5).abs() < 1e-12);
    assert!((set.norm - (0.25f64 + 0.0625 + 0.0625).sqrt()).abs() < 1e-12);
}

#[test]
fn test_prepare_collapses_case_variants_and_drops_small() {
    let records = vec![
        record("TF1", "G0", 1.0, 1.0),
        record("TF1", "g0", 1.0, 1.0),
        record("TF1", "G1", 1.0, 1.0),
        record("TF1", "MISSING", 1.0, 1.0),
        record("TF2", "G3", 1.0, 1.0),
        record("TF2", "G4", 1.0, 1.0),
        record("TF2", "G5", 1.0, 1.0),
    ];
    let names = genes(6);
    let map = build_symbol_map(names.iter().map(String::as_str));
    let (sets, dropped) = prepare_tf_sets(&build_regulon(&records), &map, 3);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].name, "TF2");
    assert_eq!(
        dropped,
        vec![DroppedTf {
            name: "TF1".to_string(),
            n_found: 2,
        }]
    );
}

#[test]
fn test_area_direction_follows_mode_of_regulation() {
    let signature: Vec<f64> = (0..20).map(|g| g as f64).collect();
    let mut records = Vec::new();
    for g in 16..20 {
        records.push(record("UP", &format!("G{g}"), 1.0, 1.0));
        records.push(record("DOWN", &format!("G{g}"), -1.0, 1.0));
    }
    for g in 0..4 {
        records.push(record("LOW", &format!("G{g}"), 1.0, 1.0));
    }
    let sets = sets_for(&records, 20, 4);
    let names: Vec<&str> = sets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["DOWN", "LOW", "UP"]);

    let scores = score_single(&signature, &sets);
    assert!(scores[2] > 2.0, "UP {}", scores[2]);
    assert!((scores[0] + scores[2]).abs() < 1e-6);
    assert!(scores[1] < -2.0, "LOW {}", scores[1]);
}

#[test]
fn test_area_undirected_targets_score_extremes() {
    let signature: Vec<f64> = (0..20).map(|g| g as f64).collect();
    let records: Vec<InteractionRecord> = [0usize, 1, 18, 19]
        .iter()
        .map(|g| record("ANY", &format!("G{g}"), 0.0, 1.0))
        .collect();
    let sets = sets_for(&records, 20, 4);
    let scores = score_single(&signature, &sets);
    // no signed component, so the score is the one-tailed part alone
    assert!(scores[0] > 0.0);
}

#[test]
fn test_area_zero_likelihood_is_nan() {
    let signature: Vec<f64> = (0..10).map(|g| g as f64).collect();
    let records: Vec<InteractionRecord> = (0..4)
        .map(|g| record("ZERO", &format!("G{g}"), 1.0, 0.0))
        .collect();
    let sets = sets_for(&records, 10, 4);
    assert_eq!(sets[0].norm, 0.0);
    assert!(score_single(&signature, &sets)[0].is_nan());
}

#[test]
fn test_one_tail_shift_spans_all_cells() {
    // no ties: extreme quantiles 0.2 and 0.8
    let distinct = rank_quantiles(&[0.0, 1.0, 2.0, 3.0]);
    // tied pairs: quantiles 0.3 and 0.7 only
    let tied = rank_quantiles(&[0.0, 0.0, 1.0, 1.0]);
    assert!((one_tail_shift(std::slice::from_ref(&tied)) - 0.3).abs() < 1e-12);
    let shift = one_tail_shift(&[distinct, tied.clone()]);
    assert!((shift - 0.2).abs() < 1e-12);

    let records: Vec<InteractionRecord> = (0..4)
        .map(|g| record("ANY", &format!("G{g}"), 0.0, 1.0))
        .collect();
    let sets = sets_for(&records, 4, 4);
    let run_wide = area_cell(&tied, shift, &sets)[0];
    let own_cell = area_cell(&tied, 0.3, &sets)[0];
    assert!(run_wide.is_finite());
    assert!((run_wide - own_cell).abs() > 1e-3);
}
