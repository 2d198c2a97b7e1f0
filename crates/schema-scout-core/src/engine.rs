use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::grouper::SchemaGrouper;
use crate::progress::ProgressReporter;
use crate::reader;
use crate::scanner;
use crate::schema::FileRecord;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct ScanEngine {
    config: AppConfig,
}

#[derive(Debug)]
pub struct ScanResult {
    pub scan_duration: Duration,
    pub read_duration: Duration,
    pub group_duration: Duration,
    pub total_files_scanned: usize,
    pub total_bytes_scanned: u64,
    pub unreadable_files: usize,
    pub grouper: SchemaGrouper,
}

impl ScanResult {
    pub fn schema_groups(&self) -> usize {
        self.grouper.schema_groups().count()
    }

    pub fn error_groups(&self) -> usize {
        self.grouper.error_groups().count()
    }

    pub fn variations(&self) -> usize {
        self.grouper
            .schema_groups()
            .map(|g| g.variations().len())
            .sum()
    }
}

impl ScanEngine {
    /// Fails on an invalid similarity threshold, before any file is touched.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the full pipeline:
    /// 1. Parallel directory scan for Parquet files (sorted discovery order)
    /// 2. Parallel footer reads and normalization, order preserved
    /// 3. Sequential grouping in discovery order
    pub fn scan(&self, reporter: &dyn ProgressReporter) -> Result<ScanResult, Error> {
        let roots = config::non_overlapping_directories(self.config.root_paths.clone());
        info!("Processing directories: {:?}", roots);

        let root_slices: Vec<&str> = roots.iter().map(|s| s.as_str()).collect();
        let ignore_slices: Vec<&str> =
            self.config.ignore_patterns.iter().map(|s| s.as_str()).collect();

        // Phase 1: Scan
        reporter.on_scan_start();
        let scan_start = Instant::now();
        let files = scanner::find_parquet_files(&root_slices, &ignore_slices)?;
        let scan_duration = scan_start.elapsed();
        let total_bytes_scanned: u64 = files.iter().map(|f| f.size).sum();
        reporter.on_scan_complete(files.len(), scan_duration.as_secs_f64());
        info!("Found {} parquet files", files.len());

        // Phase 2: Read metadata
        reporter.on_read_start(files.len());
        let read_start = Instant::now();
        let files_read = AtomicUsize::new(0);
        let records: Vec<FileRecord> = files
            .par_iter()
            .map(|file| {
                let schema = reader::inspect(&file.path);
                let done = files_read.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_read_progress(done, files.len());
                FileRecord {
                    path: file.path.to_string_lossy().into_owned(),
                    schema,
                }
            })
            .collect();
        let read_duration = read_start.elapsed();
        let unreadable_files = records.iter().filter(|r| r.schema.error().is_some()).count();
        reporter.on_read_complete(unreadable_files, read_duration.as_secs_f64());
        debug!(
            "Metadata read in {:.2}s, {} unreadable files",
            read_duration.as_secs_f64(),
            unreadable_files
        );

        // Phase 3: Group
        reporter.on_group_start();
        let group_start = Instant::now();
        let grouper = group_records(records, self.config.similarity_threshold)?;
        let group_duration = group_start.elapsed();
        reporter.on_group_complete(grouper.len(), group_duration.as_secs_f64());
        info!("Found {} unique schema groups", grouper.len());

        Ok(ScanResult {
            scan_duration,
            read_duration,
            group_duration,
            total_files_scanned: files.len(),
            total_bytes_scanned,
            unreadable_files,
            grouper,
        })
    }
}

/// Feed records to a fresh grouper, in order.
pub fn group_records(
    records: impl IntoIterator<Item = FileRecord>,
    similarity_threshold: f64,
) -> Result<SchemaGrouper, Error> {
    let mut grouper = SchemaGrouper::new(similarity_threshold)?;
    for record in records {
        grouper.add_file(record.path, record.schema);
    }
    Ok(grouper)
}

/// Read JSON Lines input records. Blank lines are skipped.
pub fn read_records(path: &Path) -> Result<Vec<FileRecord>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|source| Error::Record { line: i + 1, source })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_engine_rejects_invalid_threshold() {
        let config = AppConfig {
            similarity_threshold: 0.0,
            ..AppConfig::default()
        };
        assert!(matches!(ScanEngine::new(config), Err(Error::InvalidThreshold(_))));
    }

    #[test]
    fn test_read_records_reports_bad_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"path": "a.parquet", "error": "boom"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not json").unwrap();

        match read_records(file.path()) {
            Err(Error::Record { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected record error, got {:?}", other),
        }
    }

    #[test]
    fn test_group_records_empty_input() {
        let grouper = group_records(Vec::new(), 0.9).unwrap();
        assert!(grouper.is_empty());
    }
}
