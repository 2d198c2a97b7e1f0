use parquet::basic::{Compression, LogicalType, Repetition, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use schema_scout_core::report::{write_reports, ReportOutputs};
use schema_scout_core::{AppConfig, Group, ScanEngine, SilentReporter};

/// Write a single-row-group file with one string column `id` followed by the given
/// Int64 columns.
fn write_parquet(path: &Path, ids: &[&str], int_columns: &[&str], compression: Compression) {
    let mut fields = vec![Arc::new(
        Type::primitive_type_builder("id", PhysicalType::BYTE_ARRAY)
            .with_repetition(Repetition::REQUIRED)
            .with_logical_type(Some(LogicalType::String))
            .build()
            .unwrap(),
    )];
    for name in int_columns {
        fields.push(Arc::new(
            Type::primitive_type_builder(name, PhysicalType::INT64)
                .with_repetition(Repetition::REQUIRED)
                .build()
                .unwrap(),
        ));
    }
    let schema = Arc::new(
        Type::group_type_builder("schema")
            .with_fields(fields)
            .build()
            .unwrap(),
    );

    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(compression)
            .build(),
    );
    let file = fs::File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();
    let mut row_group = writer.next_row_group().unwrap();
    let numbers: Vec<i64> = (0..ids.len() as i64).collect();
    while let Some(mut column) = row_group.next_column().unwrap() {
        match column.untyped() {
            ColumnWriter::ByteArrayColumnWriter(typed) => {
                let values: Vec<ByteArray> = ids.iter().map(|s| ByteArray::from(*s)).collect();
                typed.write_batch(&values, None, None).unwrap();
            }
            ColumnWriter::Int64ColumnWriter(typed) => {
                typed.write_batch(&numbers, None, None).unwrap();
            }
            _ => panic!("unexpected column writer"),
        }
        column.close().unwrap();
    }
    row_group.close().unwrap();
    writer.close().unwrap();
}

const NINE: &[&str] = &["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8", "c9"];
const NINE_SWAPPED: &[&str] = &["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8", "x9"];

/// Layout:
///   root/
///     a_1.parquet        (id + c1..c9, 3 rows)
///     a_2.parquet        (same schema, 2 rows)
///     b_variant.parquet  (id + c1..c8 + x9, similarity 0.9 to a_1)
///     c_other.parquet    (id + total)
///     d_broken.parquet   (not parquet)
///     nested/
///       e.parquet        (same schema as a_1)
///     notes.txt          (ignored: wrong extension)
///     empty.parquet      (ignored: zero bytes)
fn create_lake(root: &Path) {
    let nested = root.join("nested");
    fs::create_dir_all(&nested).unwrap();

    let ids = ["alpha", "bravo", "charlie"];
    write_parquet(&root.join("a_1.parquet"), &ids, NINE, Compression::UNCOMPRESSED);
    write_parquet(&root.join("a_2.parquet"), &ids[..2], NINE, Compression::UNCOMPRESSED);
    write_parquet(&root.join("b_variant.parquet"), &ids, NINE_SWAPPED, Compression::UNCOMPRESSED);
    write_parquet(&root.join("c_other.parquet"), &ids, &["total"], Compression::UNCOMPRESSED);
    write_parquet(&nested.join("e.parquet"), &ids, NINE, Compression::UNCOMPRESSED);
    fs::write(root.join("d_broken.parquet"), b"PAR1 but not really").unwrap();
    fs::write(root.join("notes.txt"), "not a parquet file").unwrap();
    fs::write(root.join("empty.parquet"), b"").unwrap();
}

fn scan(root: &Path, threshold: f64) -> schema_scout_core::ScanResult {
    let config = AppConfig {
        root_paths: vec![root.to_string_lossy().into_owned()],
        similarity_threshold: threshold,
        ..AppConfig::default()
    };
    ScanEngine::new(config).unwrap().scan(&SilentReporter).unwrap()
}

#[test]
fn test_full_scan_pipeline() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("lake");
    create_lake(&root);

    let result = scan(&root, 0.9);

    assert_eq!(result.total_files_scanned, 6);
    assert_eq!(result.unreadable_files, 1);
    assert_eq!(result.schema_groups(), 2);
    assert_eq!(result.error_groups(), 1);
    assert_eq!(result.variations(), 2);

    let groups = result.grouper.groups();
    assert_eq!(groups.len(), 3);

    let base = groups[0].as_schema().unwrap();
    assert_eq!(base.file_count(), 4);
    let variations = base.variations();
    let file_names = |files: &[String]| -> Vec<String> {
        files
            .iter()
            .map(|f| Path::new(f).file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    };
    // nested/e.parquet sorts after the files at the root and rejoins variation 0.
    assert_eq!(
        file_names(&variations[0].members.files),
        vec!["a_1.parquet", "a_2.parquet", "e.parquet"]
    );
    assert_eq!(variations[0].members.row_counts, vec![3, 2, 3]);
    assert_eq!(file_names(&variations[1].members.files), vec!["b_variant.parquet"]);
    let diff = variations[1].differences.as_ref().unwrap();
    assert_eq!(diff.added[0].name, "x9");
    assert_eq!(diff.removed[0].name, "c9");

    let other = groups[1].as_schema().unwrap();
    assert_eq!(other.file_count(), 1);
    assert!(other.variations().is_empty());

    match &groups[2] {
        Group::Error(group) => assert_eq!(file_names(&group.files), vec!["d_broken.parquet"]),
        other => panic!("expected error group, got {:?}", other),
    }
}

#[test]
fn test_scan_reads_schema_details() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("lake");
    create_lake(&root);

    let result = scan(&root, 0.9);
    let group = result.grouper.groups()[0].as_schema().unwrap();
    let schema = group.representative();

    assert_eq!(schema.columns.len(), 10);
    assert_eq!(schema.columns[0].name, "id");
    assert_eq!(schema.columns[0].data_type, "Utf8");
    assert!(schema.columns[0].is_string);
    assert_eq!(schema.columns[1].data_type, "Int64");
    assert!(!schema.columns[1].is_string);
    assert_eq!(schema.metadata.num_rows, 3);
    assert_eq!(schema.metadata.num_columns, 10);
    assert!(schema.metadata.compression_codecs.contains("UNCOMPRESSED"));
    assert!(schema.metadata.total_compressed_size > 0);
}

#[test]
fn test_strict_threshold_splits_variant_into_own_group() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("lake");
    create_lake(&root);

    let result = scan(&root, 1.0);
    assert_eq!(result.schema_groups(), 3);
    assert_eq!(result.variations(), 0);
}

#[test]
fn test_ignore_patterns_skip_directories() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("lake");
    create_lake(&root);

    let config = AppConfig {
        root_paths: vec![root.to_string_lossy().into_owned()],
        ignore_patterns: vec!["*/nested".to_string()],
        ..AppConfig::default()
    };
    let result = ScanEngine::new(config).unwrap().scan(&SilentReporter).unwrap();
    assert_eq!(result.total_files_scanned, 5);
}

#[test]
fn test_scan_then_write_reports() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("lake");
    create_lake(&root);
    let out = tempdir().unwrap();

    let result = scan(&root, 0.9);
    let outputs = ReportOutputs {
        text: Some(out.path().join("report.txt")),
        json: Some(out.path().join("report.json")),
        csv: Some(out.path().join("assignments.csv")),
    };
    let report = write_reports(&result.grouper, &outputs).unwrap();
    assert_eq!(report.total_files, 6);

    let text = fs::read_to_string(out.path().join("report.txt")).unwrap();
    assert!(text.contains("Schema Group 1 (4 files):"));
    assert!(text.contains("Added: x9 (Int64)"));
    assert!(text.contains("Removed: c9 (Int64)"));
    assert!(text.contains("Error Group 3 (1 files):"));

    let csv = fs::read_to_string(out.path().join("assignments.csv")).unwrap();
    assert_eq!(csv.lines().count(), 7);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(json["groups"][0]["variations"].as_array().unwrap().len(), 2);
}

#[test]
fn test_empty_directory() {
    let tmp = tempdir().unwrap();
    let result = scan(tmp.path(), 0.9);
    assert_eq!(result.total_files_scanned, 0);
    assert!(result.grouper.is_empty());
}
