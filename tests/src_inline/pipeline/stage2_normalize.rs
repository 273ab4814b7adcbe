use super::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::expr::ExpressionSource;
use crate::input::load_input_tenx;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!(
        "kira_tfactivity_stage2_{}_{}",
        std::process::id(),
        id
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_mtx(path: &Path, rows: usize, cols: usize, entries: &[(usize, usize, i64)]) {
    let mut out = String::new();
    out.push_str("%%MatrixMarket matrix coordinate integer general\n");
    out.push_str("% generated\n");
    out.push_str(&format!("{} {} {}\n", rows, cols, entries.len()));
    for (r, c, v) in entries {
        out.push_str(&format!("{} {} {}\n", r, c, v));
    }
    write_file(path, &out);
}

fn setup_bundle(
    dir: &Path,
    rows: usize,
    cols: usize,
    entries: &[(usize, usize, i64)],
) -> InputBundle {
    let mut feats = String::new();
    for i in 0..rows {
        feats.push_str(&format!("G{}\tGene{}\tGene Expression\n", i + 1, i + 1));
    }
    write_file(&dir.join("features.tsv"), &feats);

    let mut bcs = String::new();
    for i in 0..cols {
        bcs.push_str(&format!("CELL-{}\n", i + 1));
    }
    write_file(&dir.join("barcodes.tsv"), &bcs);

    write_mtx(&dir.join("matrix.mtx"), rows, cols, entries);

    load_input_tenx(dir, None).unwrap()
}

#[test]
fn test_small_mtx_stats_and_values() {
    let dir = make_temp_dir();
    let bundle = setup_bundle(&dir, 2, 2, &[(1, 1, 1), (2, 1, 2), (2, 2, 3)]);

    let accessor = build_expr_accessor(&bundle).unwrap();

    assert_eq!(accessor.n_cells(), 2);
    assert_eq!(accessor.n_genes(), 2);
    assert_eq!(accessor.libsize(0), 3.0);
    assert_eq!(accessor.libsize(1), 3.0);
    assert_eq!(accessor.nnz(0), 2);
    assert_eq!(accessor.nnz(1), 1);

    assert_eq!(accessor.counts()[0], vec![(0, 1.0), (1, 2.0)]);
    assert_eq!(accessor.counts()[1], vec![(1, 3.0)]);
}

#[test]
fn test_normalized_values() {
    let dir = make_temp_dir();
    let bundle = setup_bundle(&dir, 2, 2, &[(1, 1, 1), (2, 1, 3)]);

    let norm = build_expr_accessor(&bundle).unwrap();
    let columns = norm.normalized_columns();

    let expected0 = (1.0f64 / 4.0 * 10_000.0).ln_1p() as f32;
    let expected1 = (3.0f64 / 4.0 * 10_000.0).ln_1p() as f32;
    assert_eq!(columns[0], vec![(0, expected0), (1, expected1)]);

    // empty cell stays empty
    assert!(columns[1].is_empty());
    assert_eq!(norm.libsize(1), 0.0);
}

#[test]
fn test_experiment_slots() {
    let dir = make_temp_dir();
    let bundle = setup_bundle(&dir, 3, 2, &[(1, 1, 2), (3, 1, 2), (2, 2, 6)]);
    let accessor = build_expr_accessor(&bundle).unwrap();

    let Experiment::Normalized(normalized) =
        build_experiment(&bundle, &accessor, ExprSourceKind::Normalized)
    else {
        panic!("expected normalized container");
    };
    assert_eq!(normalized.cells, vec!["CELL-1", "CELL-2"]);
    assert_eq!(normalized.genes, vec!["GENE1", "GENE2", "GENE3"]);
    let m = normalized.as_expression_matrix().unwrap();
    let half = (0.5f64 * 10_000.0).ln_1p() as f32;
    assert_eq!(m.row(0), &[half, 0.0]);

    let Experiment::LogCounts(logcounts) =
        build_experiment(&bundle, &accessor, ExprSourceKind::LogCounts)
    else {
        panic!("expected logcounts container");
    };
    // libsizes 4 and 6, mean 5
    let sf = logcounts.size_factors();
    assert!((sf[0] - 0.8).abs() < 1e-12);
    assert!((sf[1] - 1.2).abs() < 1e-12);
    let m = logcounts.as_expression_matrix().unwrap();
    assert!((m.get(1, 1) - (6.0f64 / 1.2 + 1.0).log2() as f32).abs() < 1e-6);
    assert_eq!(m.get(1, 0), 0.0);
}

#[test]
fn test_run_stage2_dispatch() {
    let dir = make_temp_dir();
    let bundle = setup_bundle(&dir, 2, 2, &[(1, 1, 1), (2, 2, 3)]);
    let out = run_stage2(&bundle, ExprSourceKind::LogCounts).unwrap();
    assert!(matches!(
        out.experiment.as_score_input(),
        crate::expr::ScoreInput::LogCounts(_)
    ));
    assert_eq!(out.accessor.libsize(1), 3.0);
}

#[test]
fn test_determinism_bitwise() {
    let dir = make_temp_dir();
    let bundle = setup_bundle(&dir, 3, 3, &[(1, 1, 1), (2, 1, 2), (3, 2, 3), (1, 3, 4)]);

    let a = build_expr_accessor(&bundle).unwrap();
    let b = build_expr_accessor(&bundle).unwrap();

    let bits = |cols: Vec<Vec<(u32, f32)>>| -> Vec<Vec<(u32, u32)>> {
        cols.into_iter()
            .map(|col| col.into_iter().map(|(g, v)| (g, v.to_bits())).collect())
            .collect()
    };
    assert_eq!(bits(a.normalized_columns()), bits(b.normalized_columns()));
}
