//! Turns raw per-file metadata into a [`FileSchemaInfo`].
//!
//! The raw types here are the boundary with whatever reads file footers: the
//! reader fills them in, the normalizer decides string-ness, runs the cardinality
//! estimator and builds the aggregate metadata.

use crate::cardinality::{self, StringStats};
use crate::schema::{ColumnInfo, ColumnStat, FileMetadata, FileSchemaInfo, ParsedSchema};
use arrow_schema::DataType;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Column chunk statistics as read from the first row group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStatistics {
    pub min: Option<String>,
    pub max: Option<String>,
    pub null_count: u64,
    /// Non-null value count.
    pub num_values: u64,
}

impl RawStatistics {
    pub fn has_min_max(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumnChunk {
    pub compression: String,
    pub statistics: Option<RawStatistics>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub data_type: DataType,
    /// `Ok(None)` when the file has no row groups, `Err` when the chunk metadata
    /// for this column could not be read.
    pub chunk: Result<Option<RawColumnChunk>, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFileMetadata {
    pub num_row_groups: u64,
    pub num_rows: u64,
    pub num_columns: u64,
    pub created_by: Option<String>,
    pub total_compressed_size: u64,
    pub columns: Vec<RawColumn>,
}

/// Plain strings and dictionaries of strings.
pub fn is_string_type(data_type: &DataType) -> bool {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Dictionary(_, value_type) => matches!(
            value_type.as_ref(),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
        ),
        _ => false,
    }
}

/// Normalize a read result. A failed read becomes an error record carrying the
/// failure description.
pub fn normalize(raw: Result<RawFileMetadata, String>) -> FileSchemaInfo {
    match raw {
        Ok(raw) => FileSchemaInfo::Parsed(normalize_metadata(&raw)),
        Err(error) => FileSchemaInfo::failed(error),
    }
}

pub fn normalize_metadata(raw: &RawFileMetadata) -> ParsedSchema {
    let mut metadata = FileMetadata {
        num_row_groups: raw.num_row_groups,
        num_rows: raw.num_rows,
        num_columns: raw.num_columns,
        created_by: raw.created_by.clone(),
        total_compressed_size: raw.total_compressed_size,
        compression_codecs: BTreeSet::new(),
        masked_columns_count: 0,
        high_cardinality_columns: 0,
    };

    let mut columns = Vec::with_capacity(raw.columns.len());
    for column in &raw.columns {
        let is_string = is_string_type(&column.data_type);

        let stats = match &column.chunk {
            Ok(Some(chunk)) => {
                metadata.compression_codecs.insert(chunk.compression.clone());
                chunk
                    .statistics
                    .as_ref()
                    .map(|stats| column_stat(&column.name, is_string, stats))
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Statistics unavailable for column '{}': {}", column.name, e);
                None
            }
        };

        if stats.as_ref().is_some_and(|s| s.is_masked) {
            metadata.masked_columns_count += 1;
            metadata.high_cardinality_columns += 1;
        }

        columns.push(ColumnInfo {
            name: column.name.clone(),
            data_type: column.data_type.to_string(),
            is_string,
            stats,
        });
    }

    ParsedSchema { columns, metadata }
}

fn column_stat(name: &str, is_string: bool, stats: &RawStatistics) -> ColumnStat {
    let cardinality_ratio = if is_string && stats.has_min_max() {
        let estimate = cardinality::estimate_cardinality(&StringStats {
            has_min_max: true,
            min: stats.min.as_deref(),
            max: stats.max.as_deref(),
            num_values: stats.num_values,
        });
        debug!("Column '{}': estimated distinct count {:?}", name, estimate);
        estimate.and_then(|e| cardinality::cardinality_ratio(e, stats.num_values))
    } else {
        None
    };

    ColumnStat {
        null_count: stats.null_count,
        num_values: stats.num_values,
        cardinality_ratio,
        is_masked: cardinality::is_masked(cardinality_ratio),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(codec: &str, min: &str, max: &str, num_values: u64) -> Result<Option<RawColumnChunk>, String> {
        Ok(Some(RawColumnChunk {
            compression: codec.to_string(),
            statistics: Some(RawStatistics {
                min: Some(min.to_string()),
                max: Some(max.to_string()),
                null_count: 2,
                num_values,
            }),
        }))
    }

    fn raw(columns: Vec<RawColumn>) -> RawFileMetadata {
        RawFileMetadata {
            num_row_groups: 1,
            num_rows: 1000,
            num_columns: columns.len() as u64,
            created_by: Some("parquet-rs".to_string()),
            total_compressed_size: 4096,
            columns,
        }
    }

    #[test]
    fn test_string_detection() {
        assert!(is_string_type(&DataType::Utf8));
        assert!(is_string_type(&DataType::LargeUtf8));
        assert!(is_string_type(&DataType::Dictionary(
            Box::new(DataType::Int32),
            Box::new(DataType::Utf8)
        )));
        assert!(!is_string_type(&DataType::Dictionary(
            Box::new(DataType::Int32),
            Box::new(DataType::Int64)
        )));
        assert!(!is_string_type(&DataType::Binary));
        assert!(!is_string_type(&DataType::Int64));
    }

    #[test]
    fn test_masked_string_column_counts() {
        let schema = normalize_metadata(&raw(vec![
            RawColumn {
                name: "pnr".to_string(),
                data_type: DataType::Utf8,
                chunk: chunk("SNAPPY", "010100-5803", "999999-9999", 1000),
            },
            RawColumn {
                name: "region".to_string(),
                data_type: DataType::Utf8,
                chunk: chunk("SNAPPY", "AB", "CD", 10),
            },
        ]));

        let pnr = schema.columns[0].stats.as_ref().unwrap();
        assert_eq!(pnr.cardinality_ratio, Some(0.9));
        assert!(pnr.is_masked);
        assert_eq!(pnr.null_count, 2);

        let region = schema.columns[1].stats.as_ref().unwrap();
        assert_eq!(region.cardinality_ratio, Some(0.5));
        assert!(region.is_masked);

        assert_eq!(schema.metadata.masked_columns_count, 2);
        assert_eq!(schema.metadata.high_cardinality_columns, 2);
        assert_eq!(schema.metadata.num_rows, 1000);
    }

    #[test]
    fn test_non_string_column_has_no_ratio() {
        let schema = normalize_metadata(&raw(vec![RawColumn {
            name: "amount".to_string(),
            data_type: DataType::Int64,
            chunk: chunk("ZSTD", "1", "100", 50),
        }]));

        let col = &schema.columns[0];
        assert!(!col.is_string);
        assert_eq!(col.data_type, "Int64");
        let stats = col.stats.as_ref().unwrap();
        assert_eq!(stats.cardinality_ratio, None);
        assert!(!stats.is_masked);
        assert_eq!(schema.metadata.masked_columns_count, 0);
    }

    #[test]
    fn test_low_cardinality_is_not_masked() {
        // "10".."30" over 100 values: estimate 20, ratio 0.2.
        let schema = normalize_metadata(&raw(vec![RawColumn {
            name: "code".to_string(),
            data_type: DataType::Utf8,
            chunk: chunk("SNAPPY", "10", "30", 100),
        }]));
        let stats = schema.columns[0].stats.as_ref().unwrap();
        assert_eq!(stats.cardinality_ratio, Some(0.2));
        assert!(!stats.is_masked);
    }

    #[test]
    fn test_empty_column_never_masked() {
        let schema = normalize_metadata(&raw(vec![RawColumn {
            name: "empty".to_string(),
            data_type: DataType::Utf8,
            chunk: chunk("SNAPPY", "a", "b", 0),
        }]));
        let stats = schema.columns[0].stats.as_ref().unwrap();
        assert_eq!(stats.cardinality_ratio, None);
        assert!(!stats.is_masked);
    }

    #[test]
    fn test_partial_statistics_loss_is_local() {
        let schema = normalize_metadata(&raw(vec![
            RawColumn {
                name: "broken".to_string(),
                data_type: DataType::Utf8,
                chunk: Err("corrupt chunk".to_string()),
            },
            RawColumn {
                name: "fine".to_string(),
                data_type: DataType::Utf8,
                chunk: chunk("GZIP", "AB", "CD", 10),
            },
        ]));

        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].name, "broken");
        assert_eq!(schema.columns[0].stats, None);
        assert!(schema.columns[1].stats.is_some());
        assert_eq!(
            schema.metadata.compression_codecs.iter().collect::<Vec<_>>(),
            vec!["GZIP"]
        );
    }

    #[test]
    fn test_codec_recorded_without_statistics() {
        let schema = normalize_metadata(&raw(vec![RawColumn {
            name: "blob".to_string(),
            data_type: DataType::Binary,
            chunk: Ok(Some(RawColumnChunk {
                compression: "LZ4_RAW".to_string(),
                statistics: None,
            })),
        }]));
        assert_eq!(schema.columns[0].stats, None);
        assert!(schema.metadata.compression_codecs.contains("LZ4_RAW"));
    }

    #[test]
    fn test_failed_read_becomes_error_record() {
        let info = normalize(Err("Invalid Parquet file. Corrupt footer".to_string()));
        assert_eq!(info.error(), Some("Invalid Parquet file. Corrupt footer"));
    }
}
