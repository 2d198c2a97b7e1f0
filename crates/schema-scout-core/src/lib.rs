pub mod cardinality;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod grouper;
pub mod normalize;
pub mod progress;
pub mod reader;
pub mod report;
pub mod scanner;
pub mod schema;

pub use config::AppConfig;
pub use engine::{ScanEngine, ScanResult};
pub use error::Error;
pub use fingerprint::{Fingerprint, GroupKey};
pub use grouper::{Group, Placement, SchemaGroup, SchemaGrouper};
pub use progress::{ProgressReporter, SilentReporter};
pub use schema::{ColumnInfo, ColumnStat, FileMetadata, FileRecord, FileSchemaInfo, ParsedSchema};
