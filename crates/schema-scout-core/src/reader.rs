//! Parquet footer reader.
//!
//! Reads only file metadata: the Arrow view of the schema, and the compression
//! codec and statistics of each column chunk in the first row group. No data pages
//! are decoded.

use crate::error::Error;
use crate::normalize::{self, RawColumn, RawColumnChunk, RawFileMetadata, RawStatistics};
use crate::schema::FileSchemaInfo;
use parquet::arrow::parquet_to_arrow_schema;
use parquet::basic::Compression;
use parquet::file::metadata::{ParquetMetaData, RowGroupMetaData};
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::File;
use std::path::Path;
use tracing::warn;

/// Read and normalize one file. Failures become an error record.
pub fn inspect(path: &Path) -> FileSchemaInfo {
    let raw = read_file_metadata(path).map_err(|e| {
        warn!("Error reading metadata for {}: {}", path.display(), e);
        e.to_string()
    });
    normalize::normalize(raw)
}

pub fn read_file_metadata(path: &Path) -> Result<RawFileMetadata, Error> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    raw_metadata(reader.metadata())
}

pub fn raw_metadata(meta: &ParquetMetaData) -> Result<RawFileMetadata, Error> {
    let file_meta = meta.file_metadata();
    let schema_descr = file_meta.schema_descr();
    let arrow_schema = parquet_to_arrow_schema(schema_descr, file_meta.key_value_metadata())?;
    let first_row_group = meta.row_groups().first();

    let columns = arrow_schema
        .fields()
        .iter()
        .map(|field| RawColumn {
            name: field.name().clone(),
            data_type: field.data_type().clone(),
            chunk: match first_row_group {
                Some(row_group) => column_chunk(row_group, field.name()).map(Some),
                None => Ok(None),
            },
        })
        .collect();

    Ok(RawFileMetadata {
        num_row_groups: meta.num_row_groups() as u64,
        num_rows: u64::try_from(file_meta.num_rows()).unwrap_or(0),
        num_columns: schema_descr.num_columns() as u64,
        created_by: file_meta.created_by().map(str::to_string),
        total_compressed_size: meta
            .row_groups()
            .iter()
            .map(|rg| u64::try_from(rg.compressed_size()).unwrap_or(0))
            .sum(),
        columns,
    })
}

/// Chunk metadata for a top-level field: its first leaf column in the row group.
fn column_chunk(row_group: &RowGroupMetaData, field_name: &str) -> Result<RawColumnChunk, String> {
    let chunk = row_group
        .columns()
        .iter()
        .find(|c| c.column_path().parts().first().map(String::as_str) == Some(field_name))
        .ok_or_else(|| format!("no column chunk for field '{}'", field_name))?;

    let statistics = chunk.statistics().map(|stats| {
        let null_count = stats.null_count_opt().unwrap_or(0);
        let total_values = u64::try_from(chunk.num_values()).unwrap_or(0);
        RawStatistics {
            min: stats.min_bytes_opt().map(decode_bound),
            max: stats.max_bytes_opt().map(decode_bound),
            null_count,
            num_values: total_values.saturating_sub(null_count),
        }
    });

    Ok(RawColumnChunk {
        compression: codec_name(chunk.compression()),
        statistics,
    })
}

fn decode_bound(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Upper-case codec identifier without its level, e.g. `ZSTD` for `ZSTD(ZstdLevel(3))`.
pub fn codec_name(compression: Compression) -> String {
    let debug = format!("{:?}", compression);
    match debug.split_once('(') {
        Some((name, _)) => name.to_string(),
        None => debug,
    }
}
