mod walk;

pub use walk::{find_parquet_files, DiscoveredFile};
