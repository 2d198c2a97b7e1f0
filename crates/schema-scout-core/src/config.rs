use crate::error::Error;
use crate::grouper::{self, DEFAULT_SIMILARITY_THRESHOLD};
use crate::report::ReportOutputs;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_root_paths")]
    pub root_paths: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_report_path")]
    pub report_path: String,
    #[serde(default)]
    pub json_report_path: Option<String>,
    #[serde(default)]
    pub csv_path: Option<String>,
}

fn default_root_paths() -> Vec<String> {
    vec![".".to_string()]
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_report_path() -> String {
    "parquet_schema_report.txt".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_paths: default_root_paths(),
            ignore_patterns: Vec::new(),
            similarity_threshold: default_similarity_threshold(),
            report_path: default_report_path(),
            json_report_path: None,
            csv_path: None,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        grouper::validate_threshold(self.similarity_threshold)?;
        Ok(())
    }

    pub fn report_outputs(&self) -> ReportOutputs {
        ReportOutputs {
            text: Some(PathBuf::from(&self.report_path)),
            json: self.json_report_path.as_ref().map(PathBuf::from),
            csv: self.csv_path.as_ref().map(PathBuf::from),
        }
    }
}

/// Load `Config.toml` (optional) overlaid with `SCHEMA_SCOUT_*` environment
/// variables.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("SCHEMA_SCOUT").try_parsing(true))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        if result
            .iter()
            .any(|kept| dir_path.starts_with(Path::new(kept)))
        {
            continue;
        }
        result.retain(|kept| !Path::new(kept).starts_with(dir_path));
        result.push(dir);
    }

    result
}
