mod commands;
mod logging;
mod progress;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use schema_scout_core::report::{self, SchemaReport};
use schema_scout_core::{engine, AppConfig, ScanEngine};
use std::path::Path;
use std::process;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let mut config = match schema_scout_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan { paths, output }) => {
            if !paths.is_empty() {
                config.root_paths = paths;
            }
            output.apply(&mut config);
            run_scan(config)?;
        }
        Some(Commands::Group { records, output }) => {
            output.apply(&mut config);
            run_group(&config, &records)?;
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_scan(config: AppConfig) -> anyhow::Result<()> {
    let outputs = config.report_outputs();
    let engine = ScanEngine::new(config)?;
    let reporter = CliReporter::new();
    let result = engine.scan(&reporter)?;

    println!();
    info!(
        "Scan: {}, Read: {}, Group: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.read_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.group_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files ({} bytes), {} unreadable",
        format!("{}", result.total_files_scanned).cyan(),
        format!("{}", result.total_bytes_scanned).cyan(),
        format!("{}", result.unreadable_files).red(),
    );

    let report = report::write_reports(&result.grouper, &outputs)
        .context("failed to write reports")?;
    print_summary(&report, result.variations());
    Ok(())
}

fn run_group(config: &AppConfig, records: &Path) -> anyhow::Result<()> {
    let parsed = engine::read_records(records)
        .with_context(|| format!("failed to read records from {}", records.display()))?;
    info!("Loaded {} records from {}", parsed.len(), records.display());

    let grouper = engine::group_records(parsed, config.similarity_threshold)?;
    let variations = grouper
        .schema_groups()
        .map(|g| g.variations().len())
        .sum();

    let report = report::write_reports(&grouper, &config.report_outputs())
        .context("failed to write reports")?;
    print_summary(&report, variations);
    Ok(())
}

fn print_summary(report: &SchemaReport, variations: usize) {
    info!(
        "{} schema groups, {} variations, {} error groups across {} files",
        format!("{}", report.schema_group_count()).green(),
        format!("{}", variations).yellow(),
        format!("{}", report.error_group_count()).red(),
        format!("{}", report.total_files).cyan(),
    );
}
