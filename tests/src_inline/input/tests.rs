use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::barcodes::parse_barcodes;
use super::features::{Feature, normalize_symbol, parse_features};
use super::meta::load_meta;
use super::mtx::read_mtx_csc;
use super::{InputError, build_gene_index, detect_prefix, load_input_tenx};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_tfactivity_input_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_gz(path: &Path, contents: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn feature(symbol: &str, feature_type: Option<&str>) -> Feature {
    Feature {
        symbol_norm: normalize_symbol(symbol),
        feature_type: feature_type.map(|s| s.to_string()),
    }
}

#[test]
fn test_feature_parsing_v2_v3() {
    let dir = make_temp_dir();
    let v2_path = dir.join("genes.tsv");
    let v3_path = dir.join("features.tsv.gz");

    write_file(&v2_path, "GENE1\tActb\nGENE2\tGapdh\n");
    write_gz(
        &v3_path,
        "ENSG0001\tSTAT1\tGene Expression\nENSG0002\tIRF1\tGene Expression\n",
    );

    let v2 = parse_features(&v2_path).unwrap();
    assert_eq!(v2.len(), 2);
    assert_eq!(v2[0].feature_type, None);
    assert_eq!(v2[0].symbol_norm, "ACTB");

    let v3 = parse_features(&v3_path).unwrap();
    assert_eq!(v3.len(), 2);
    assert_eq!(v3[1].symbol_norm, "IRF1");
    assert_eq!(v3[0].feature_type.as_deref(), Some("Gene Expression"));
}

#[test]
fn test_gene_symbol_normalization() {
    assert_eq!(normalize_symbol("  ensG000001.12 "), "ENSG000001");
    assert_eq!(normalize_symbol(" Stat1 "), "STAT1");
    assert_eq!(normalize_symbol("MT-CO1"), "MT-CO1");
    assert_eq!(normalize_symbol(""), "");
}

#[test]
fn test_duplicate_symbol_handling() {
    let features = vec![feature("GeneA", None), feature("GENEA", None)];
    let index = build_gene_index(&features);
    assert_eq!(index.symbols_by_gene_id, vec!["GENEA".to_string()]);
    assert_eq!(index.gene_id_by_feature, vec![Some(0), Some(0)]);
}

#[test]
fn test_non_expression_features_not_indexed() {
    let features = vec![
        feature("CD3E", Some("Gene Expression")),
        feature("CD3_TotalSeqB", Some("Antibody Capture")),
        feature("", None),
    ];
    let index = build_gene_index(&features);
    assert_eq!(index.n_genes(), 1);
    assert_eq!(index.gene_id_by_feature, vec![Some(0), None, None]);
}

#[test]
fn test_metadata_join() {
    let dir = make_temp_dir();
    let meta_path = dir.join("meta.tsv");

    write_file(
        &meta_path,
        "barcode\tsample\tcluster\nAA-1\tS1\t0\nCC-1\tS2\t3\n",
    );

    let barcodes = vec!["AA-1".to_string(), "BB-1".to_string(), "CC-1".to_string()];
    let meta = load_meta(&meta_path, &barcodes).unwrap();

    assert_eq!(meta.columns, vec!["sample".to_string(), "cluster".to_string()]);
    assert_eq!(meta.rows.len(), 3);
    assert_eq!(meta.rows[1], vec!["".to_string(), "".to_string()]);
    assert_eq!(
        meta.column("Cluster").unwrap(),
        vec!["0".to_string(), "".to_string(), "3".to_string()]
    );
    assert!(meta.column("condition").is_none());
}

#[test]
fn test_barcodes_parse_order() {
    let dir = make_temp_dir();
    let path = dir.join("barcodes.tsv.gz");
    write_gz(&path, "AA-1\nBB-1\n\nCC-1\n");

    let barcodes = parse_barcodes(&path).unwrap();
    assert_eq!(barcodes, vec!["AA-1", "BB-1", "CC-1"]);
}

#[test]
fn test_detect_prefix_present() {
    let dir = make_temp_dir();
    write_file(&dir.join("GSM123_matrix.mtx"), "x");
    let prefix = detect_prefix(&dir).unwrap();
    assert_eq!(prefix.as_deref(), Some("GSM123"));
}

#[test]
fn test_detect_prefix_absent() {
    let dir = make_temp_dir();
    write_file(&dir.join("matrix.mtx"), "x");
    write_file(&dir.join("features.tsv"), "x");
    write_file(&dir.join("barcodes.tsv"), "x");
    let prefix = detect_prefix(&dir).unwrap();
    assert_eq!(prefix, None);
}

#[test]
fn test_load_prefixed_bundle_and_read_matrix() {
    let dir = make_temp_dir();
    write_gz(
        &dir.join("GSM9_features.tsv.gz"),
        "E1\tStat1\tGene Expression\nE2\tIrf1\tGene Expression\nE3\tSTAT1\tGene Expression\n",
    );
    write_file(&dir.join("GSM9_barcodes.tsv"), "AAA-1\nCCC-1\n");
    write_file(
        &dir.join("GSM9_matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n% comment\n3 2 4\n1 1 2\n3 1 5\n2 2 7\n1 2 0\n",
    );

    let bundle = load_input_tenx(&dir, None).unwrap();
    assert_eq!(bundle.prefix.as_deref(), Some("GSM9"));
    assert_eq!(bundle.n_cells, 2);
    assert_eq!(bundle.n_features_raw, 3);
    assert_eq!(bundle.n_genes_indexed, 2);

    let csc = read_mtx_csc(
        &bundle.mtx_path,
        bundle.n_features_raw,
        bundle.n_cells,
        &bundle.gene_index,
    )
    .unwrap();
    assert_eq!(csc.n_cols, 2);
    assert_eq!(csc.cols[0], vec![(0, 7.0)]);
    assert_eq!(csc.cols[1], vec![(1, 7.0)]);
}

#[test]
fn test_real_valued_matrix() {
    let dir = make_temp_dir();
    let path = dir.join("matrix.mtx");
    write_file(
        &path,
        "%%MatrixMarket matrix coordinate real general\n2 1 2\n1 1 0.5\n2 1 1.25\n",
    );
    let index = build_gene_index(&[feature("A", None), feature("B", None)]);
    let csc = read_mtx_csc(&path, 2, 1, &index).unwrap();
    assert_eq!(csc.cols[0], vec![(0, 0.5), (1, 1.25)]);
}

#[test]
fn test_matrix_out_of_bounds_rejected() {
    let dir = make_temp_dir();
    let path = dir.join("matrix.mtx");
    write_file(
        &path,
        "%%MatrixMarket matrix coordinate integer general\n1 1 1\n2 1 3\n",
    );
    let index = build_gene_index(&[feature("A", None)]);
    let err = read_mtx_csc(&path, 1, 1, &index).unwrap_err();
    assert!(matches!(err, InputError::Parse(_)));
}

#[test]
fn test_missing_directory_is_reported() {
    let dir = make_temp_dir().join("does-not-exist");
    let err = load_input_tenx(&dir, None).unwrap_err();
    assert!(matches!(err, InputError::MissingInput(_)));
}
