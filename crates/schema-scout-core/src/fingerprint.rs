use crate::schema::{FileSchemaInfo, ParsedSchema};
use serde::Serialize;
use std::fmt;
use std::hash::Hasher as _;
use twox_hash::XxHash64;

/// Exact-match key of a schema: ordered `(name, type)` pairs plus the sorted codec
/// set. Statistics, row counts and sizes play no part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint {
    pub columns: Vec<(String, String)>,
    pub codecs: Vec<String>,
}

impl Fingerprint {
    pub fn of(schema: &ParsedSchema) -> Self {
        Self {
            columns: schema
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.data_type.clone()))
                .collect(),
            // BTreeSet iteration is already sorted.
            codecs: schema.metadata.compression_codecs.iter().cloned().collect(),
        }
    }

    /// Short stable id for reports: XxHash64 over the fingerprint contents.
    pub fn digest(&self) -> String {
        let mut hasher = XxHash64::with_seed(0);
        for (name, data_type) in &self.columns {
            hasher.write(name.as_bytes());
            hasher.write_u8(0);
            hasher.write(data_type.as_bytes());
            hasher.write_u8(0);
        }
        hasher.write_u8(0xff);
        for codec in &self.codecs {
            hasher.write(codec.as_bytes());
            hasher.write_u8(0);
        }
        format!("{:016x}", hasher.finish())
    }
}

/// Key of a group in the group table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Schema(Fingerprint),
    /// Files that could not be read group by their exact error message.
    Error(String),
}

impl GroupKey {
    pub fn for_schema(info: &FileSchemaInfo) -> Self {
        match info {
            FileSchemaInfo::Parsed(schema) => GroupKey::Schema(Fingerprint::of(schema)),
            FileSchemaInfo::Failed { error } => GroupKey::Error(error.clone()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Schema(fingerprint) => write!(f, "{}", fingerprint.digest()),
            GroupKey::Error(error) => write!(f, "ERROR:{}", error),
        }
    }
}
