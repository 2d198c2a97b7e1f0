//! Per-file schema records exchanged between the metadata reader, the grouper and
//! the report writers.
//!
//! Field names follow the record vocabulary used by existing report consumers, so
//! these types serialize to (and deserialize from) the same JSON shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Statistics observed for one column in the first row group of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStat {
    pub null_count: u64,
    /// Non-null value count.
    pub num_values: u64,
    /// Only present for string columns with usable min/max statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality_ratio: Option<f64>,
    #[serde(default)]
    pub is_masked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_string: bool,
    #[serde(default)]
    pub stats: Option<ColumnStat>,
}

impl ColumnInfo {
    pub fn is_masked(&self) -> bool {
        self.stats.as_ref().is_some_and(|s| s.is_masked)
    }

    pub fn cardinality_ratio(&self) -> Option<f64> {
        self.stats.as_ref().and_then(|s| s.cardinality_ratio)
    }
}

/// Aggregate metadata of a successfully inspected file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub num_row_groups: u64,
    pub num_rows: u64,
    pub num_columns: u64,
    #[serde(default)]
    pub created_by: Option<String>,
    pub total_compressed_size: u64,
    /// Kept sorted so fingerprints and reports are stable.
    #[serde(default)]
    pub compression_codecs: BTreeSet<String>,
    #[serde(default)]
    pub masked_columns_count: u64,
    #[serde(default)]
    pub high_cardinality_columns: u64,
}

/// Columns and aggregate metadata of one readable file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSchema {
    pub columns: Vec<ColumnInfo>,
    pub metadata: FileMetadata,
}

impl ParsedSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Outcome of inspecting one file: either its schema or the reason it could not be
/// read. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSchemaInfo {
    Parsed(ParsedSchema),
    Failed { error: String },
}

impl FileSchemaInfo {
    pub fn failed(error: impl Into<String>) -> Self {
        FileSchemaInfo::Failed {
            error: error.into(),
        }
    }

    pub fn parsed(&self) -> Option<&ParsedSchema> {
        match self {
            FileSchemaInfo::Parsed(schema) => Some(schema),
            FileSchemaInfo::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FileSchemaInfo::Parsed(_) => None,
            FileSchemaInfo::Failed { error } => Some(error),
        }
    }
}

/// One input record: a file path plus what was learned about the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    #[serde(flatten)]
    pub schema: FileSchemaInfo,
}
