use std::borrow::Cow;

use super::*;
use crate::viper::ScoreError;

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

#[test]
fn test_dense_layout_from_rows() {
    let m = ExprMatrix::from_rows(
        names("G", 2),
        names("C", 3),
        &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
    )
    .unwrap();
    assert_eq!(m.n_genes(), 2);
    assert_eq!(m.n_cells(), 3);
    assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    assert_eq!(m.get(0, 2), 3.0);
    assert_eq!(m.size_bytes(), 24);
}

#[test]
fn test_shape_mismatch_rejected() {
    let err = ExprMatrix::new(names("G", 2), names("C", 2), vec![0.0; 3]).unwrap_err();
    assert!(matches!(err, ScoreError::Shape(_)));
    let err = ExprMatrix::from_rows(names("G", 1), names("C", 2), &[vec![1.0]]).unwrap_err();
    assert!(matches!(err, ScoreError::Shape(_)));
}

#[test]
fn test_sparse_columns_scatter() {
    let m = ExprMatrix::from_sparse_columns(
        names("G", 3),
        names("C", 2),
        &[vec![(0, 1.5), (2, 2.0)], vec![(1, 3.0)]],
    )
    .unwrap();
    assert_eq!(m.row(0), &[1.5, 0.0]);
    assert_eq!(m.row(1), &[0.0, 3.0]);
    assert_eq!(m.row(2), &[2.0, 0.0]);

    let err = ExprMatrix::from_sparse_columns(names("G", 1), names("C", 1), &[vec![(4, 1.0)]])
        .unwrap_err();
    assert!(matches!(err, ScoreError::Shape(_)));
}

#[test]
fn test_non_finite_located() {
    let m = ExprMatrix::from_rows(
        names("G", 2),
        names("C", 2),
        &[vec![1.0, 2.0], vec![f32::NAN, 0.0]],
    )
    .unwrap();
    assert_eq!(m.find_non_finite(), Some((1, 0)));
}

#[test]
fn test_logcounts_size_factors() {
    let exp = LogCountsExperiment {
        genes: names("G", 2),
        cells: names("C", 3),
        counts: vec![vec![(0, 2.0), (1, 2.0)], vec![(0, 12.0)], vec![]],
    };
    let sf = exp.size_factors();
    // libsizes 4 and 12, mean 8
    assert!((sf[0] - 0.5).abs() < 1e-12);
    assert!((sf[1] - 1.5).abs() < 1e-12);
    assert_eq!(sf[2], 0.0);

    let m = exp.as_expression_matrix().unwrap();
    // 2 / 0.5 + 1 = 5
    assert!((m.get(0, 0) - 5f32.log2()).abs() < 1e-6);
    // 12 / 1.5 + 1 = 9
    assert!((m.get(0, 1) - 9f32.log2()).abs() < 1e-6);
    assert_eq!(m.get(1, 2), 0.0);
}

#[test]
fn test_score_input_dispatch() {
    let matrix = ExprMatrix::from_rows(names("G", 1), names("C", 2), &[vec![1.0, 2.0]]).unwrap();
    let input = ScoreInput::Matrix(&matrix);
    assert_eq!(input.kind(), "matrix");
    assert!(matches!(input.resolve().unwrap(), Cow::Borrowed(_)));

    let normalized = NormalizedExperiment {
        genes: names("G", 1),
        cells: names("C", 2),
        data: vec![vec![(0, 0.7)], vec![]],
    };
    let resolved = ScoreInput::Normalized(&normalized).resolve().unwrap();
    assert_eq!(resolved.row(0), &[0.7, 0.0]);
}
