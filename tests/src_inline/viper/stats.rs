use super::*;

#[test]
fn test_average_ranks_with_ties() {
    let ranks = average_ranks(&[3.0, 1.0, 3.0, 2.0]);
    assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
    assert!(average_ranks(&[]).is_empty());
}

#[test]
fn test_mean_sd_median_mad() {
    let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert_eq!(mean(&v), 5.0);
    assert!((sample_sd(&v) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    assert_eq!(median(&v), 4.5);
    assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    // deviations from 2: 1, 1, 0 -> median 1
    assert!((mad(&[1.0, 2.0, 3.0]) - 1.4826).abs() < 1e-12);
    assert!(sample_sd(&[1.0]).is_nan());
}

#[test]
fn test_qnorm_known_values() {
    assert!(qnorm(0.5).abs() < 1e-9);
    assert!((qnorm(0.975) - 1.959963984540054).abs() < 1e-8);
    assert!((qnorm(0.025) + 1.959963984540054).abs() < 1e-8);
    assert!((qnorm(0.001) + 3.090232306167813).abs() < 1e-8);
    assert!((qnorm(0.8413447460685429) - 1.0).abs() < 1e-8);
    assert_eq!(qnorm(0.0), f64::NEG_INFINITY);
    assert_eq!(qnorm(1.0), f64::INFINITY);
    assert!(qnorm(1.5).is_nan());
}

#[test]
fn test_qnorm_symmetry() {
    for p in [0.01, 0.1, 0.3, 0.45] {
        assert!((qnorm(p) + qnorm(1.0 - p)).abs() < 1e-8);
    }
}
