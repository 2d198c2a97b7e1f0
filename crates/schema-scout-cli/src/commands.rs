use clap::{Args, Parser, Subcommand};
use schema_scout_core::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "schema-scout")]
#[command(about = "Group Parquet files by schema similarity", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Discover Parquet files under the given paths and group them by schema
    Scan {
        /// Roots to scan (files or directories); defaults to the configured roots
        paths: Vec<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Group pre-extracted schema records from a JSON Lines file
    Group {
        records: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Similarity threshold in (0, 1]
    #[arg(short, long)]
    pub threshold: Option<f64>,
    /// Text report path
    #[arg(short, long)]
    pub output: Option<String>,
    /// Also write a JSON report to this path
    #[arg(long)]
    pub json: Option<String>,
    /// Also write per-file group assignments as CSV
    #[arg(long)]
    pub csv: Option<String>,
}

impl OutputArgs {
    /// Overlay command line flags on the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        if let Some(output) = &self.output {
            config.report_path = output.clone();
        }
        if self.json.is_some() {
            config.json_report_path = self.json.clone();
        }
        if self.csv.is_some() {
            config.csv_path = self.csv.clone();
        }
    }
}
