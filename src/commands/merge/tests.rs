use super::{merge_files, run_merge, MergeOptions};
use crate::{
    error::TabmergeError,
    io::{readers::ReaderRegistry, tsv_writer::WriterRegistry},
    utils::util::init_logger,
};
use column_merge::{MergeConfig, MergeError};
use flate2::{write::GzEncoder, Compression};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

fn options(flush_threshold: usize) -> MergeOptions {
    MergeOptions {
        output_name: "result".to_string(),
        output_extension: "tsv".to_string(),
        config: MergeConfig::new(flush_threshold, 2, 3).expect("test config should be valid"),
    }
}

fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("test source should be writable");
    path
}

fn read_output(dir: &Path) -> String {
    fs::read_to_string(dir.join("result").join("result.tsv")).expect("output should exist")
}

fn merge_dir(dir: &Path, flush_threshold: usize) -> crate::utils::util::Result<super::MergeSummary> {
    init_logger();
    run_merge(
        dir,
        &options(flush_threshold),
        &ReaderRegistry::default(),
        &WriterRegistry::default(),
    )
}

#[test]
fn merges_csv_json_and_xml() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    write_source(dir, "a.csv", "D2,D1,M1\n2,1,x\n");
    write_source(dir, "b.json", r#"{"fields": [{"D1": "1", "M1": "y", "M2": "z"}]}"#);
    write_source(
        dir,
        "c.xml",
        r#"<root><objects><object name="D1"><value>0</value></object><object name="M2"><value>w</value></object></objects></root>"#,
    );

    let summary = merge_dir(dir, 100).expect("merge should succeed");
    assert_eq!(summary.sources, vec!["a.csv", "b.json", "c.xml"]);
    assert_eq!(summary.columns, vec!["D1", "D2", "M1", "M2"]);
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.stats.records, 3);
    assert_eq!(summary.output, dir.join("result").join("result.tsv"));

    assert_eq!(
        read_output(dir),
        "D1\tD2\tM1\tM2\n0\t\t\tw\t\n1\t\ty\tz\t\n1\t2\tx\t\t"
    );
}

#[test]
fn values_sort_as_plain_strings() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    write_source(dir, "a.csv", "D1,M1\n9,a\nb,b\n10,c\nB,d\n");

    merge_dir(dir, 100).expect("merge should succeed");
    assert_eq!(
        read_output(dir),
        "D1\tM1\n10\tc\t\n9\ta\t\nB\td\t\nb\tb\t"
    );
}

#[test]
fn columns_sharing_a_sort_key_keep_their_values() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    write_source(dir, "a.csv", "d1,D1\na_lower,A_UPPER\n");
    write_source(dir, "b.csv", "D1,d1\nB_UPPER,b_lower\n");

    let summary = merge_dir(dir, 100).expect("merge should succeed");
    assert_eq!(summary.columns, vec!["d1", "D1"]);
    assert_eq!(
        read_output(dir),
        "d1\tD1\na_lower\tA_UPPER\t\nb_lower\tB_UPPER\t"
    );
}

#[test]
fn partial_batches_are_sorted_independently() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    write_source(dir, "a.csv", "D1,M1\n4,a\n3,b\n2,c\n1,d\n");

    let summary = merge_dir(dir, 1).expect("merge should succeed");
    assert_eq!(summary.stats.partial_flushes, 1);
    assert_eq!(summary.stats.partial_records, 2);
    assert_eq!(read_output(dir), "D1\tM1\n3\tb\t\n4\ta\t\n1\td\t\n2\tc\t");
}

#[test]
fn unusable_sources_are_skipped() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    write_source(dir, "a.csv", "D1,M1\n1,x\n");
    write_source(dir, "b.csv", "D1,D1\n1,2\n");
    let no_fields = write_source(dir, "c.json", r#"{"rows": []}"#);
    write_source(dir, "notes.txt", "ignored");

    let summary = merge_dir(dir, 100).expect("merge should succeed");
    assert_eq!(summary.sources, vec!["a.csv"]);
    assert_eq!(summary.skipped, vec![dir.join("b.csv"), no_fields]);
    assert_eq!(read_output(dir), "D1\tM1\n1\tx\t");
}

#[test]
fn gzipped_sources_are_read() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(b"D1,M1\n2,x\n1,y\n")
        .expect("gzip write should succeed");
    fs::write(
        dir.join("a.csv.gz"),
        encoder.finish().expect("gzip finish should succeed"),
    )
    .expect("gzip source should be writable");

    merge_dir(dir, 100).expect("merge should succeed");
    assert_eq!(read_output(dir), "D1\tM1\n1\ty\t\n2\tx\t");
}

#[test]
fn malformed_record_is_fatal() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    write_source(dir, "a.csv", "D1,M1\n1,x\n2\n");

    let error = merge_dir(dir, 100).expect_err("short row should stop the merge");
    assert!(error.is_fatal());
    assert!(matches!(
        error,
        TabmergeError::Merge(MergeError::MalformedRecord { expected: 2, found: 1, .. })
    ));
    // The header is written before any record is read.
    assert_eq!(read_output(dir), "D1\tM1\n");
}

#[test]
fn empty_directory_reports_no_sources() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let error = merge_dir(temp_dir.path(), 100).expect_err("nothing to merge");
    assert!(matches!(error, TabmergeError::NoSourceFiles { .. }));
    assert!(!error.is_fatal());
    assert!(!temp_dir.path().join("result").exists());
}

#[test]
fn every_source_skipped_is_not_fatal() {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    write_source(dir, "a.csv", "");

    let error = merge_dir(dir, 100).expect_err("no usable sources");
    assert!(matches!(error, TabmergeError::Merge(MergeError::NoSources)));
    assert!(!error.is_fatal());
}

#[test]
fn unsupported_output_extension_is_rejected_up_front() {
    init_logger();
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let dir = temp_dir.path();
    let source = write_source(dir, "a.csv", "D1\n1\n");

    let mut options = options(100);
    options.output_extension = "xlsx".to_string();
    let error = merge_files(
        dir,
        &[source],
        &options,
        &ReaderRegistry::default(),
        &WriterRegistry::default(),
    )
    .expect_err("xlsx output is not supported");
    assert!(matches!(error, TabmergeError::UnsupportedFormat { .. }));
    assert!(!dir.join("result").exists());
}
