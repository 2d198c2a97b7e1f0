//! Report rendering for a finished group table.
//!
//! [`build_report`] walks the groups in creation order and produces a
//! [`SchemaReport`], which can then be written as plain text, pretty JSON, or a CSV
//! of per-file assignments.

use crate::error::Error;
use crate::grouper::{Group, Members, SchemaGroup, SchemaGrouper, Variation};
use crate::schema::{ColumnInfo, ParsedSchema};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Where to write each report format. `None` skips that format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOutputs {
    pub text: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub generated_at: DateTime<Utc>,
    pub similarity_threshold: f64,
    pub total_files: usize,
    pub groups: Vec<GroupReport>,
}

impl SchemaReport {
    pub fn schema_group_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g, GroupReport::Schema(_)))
            .count()
    }

    pub fn error_group_count(&self) -> usize {
        self.groups.len() - self.schema_group_count()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupReport {
    Schema(SchemaGroupReport),
    Error(ErrorGroupReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorGroupReport {
    pub index: usize,
    pub error: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowCountRange {
    pub min: u64,
    pub max: u64,
}

impl RowCountRange {
    fn of(counts: impl IntoIterator<Item = u64>) -> Option<Self> {
        counts.into_iter().fold(None, |range, n| {
            Some(match range {
                None => RowCountRange { min: n, max: n },
                Some(r) => RowCountRange {
                    min: r.min.min(n),
                    max: r.max.max(n),
                },
            })
        })
    }
}

/// One schema group in the same vocabulary as the grouper's records: direct
/// `files`/`row_counts`/`total_size` (empty once the group has branched), the
/// representative `schema_info`, and its `variations`.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaGroupReport {
    pub index: usize,
    pub fingerprint: String,
    /// Direct files plus the files of every variation.
    pub file_count: usize,
    /// Over every member of the group, direct or in a variation.
    pub row_count_range: Option<RowCountRange>,
    pub files: Vec<String>,
    pub row_counts: Vec<u64>,
    pub total_size: u64,
    pub schema_info: ParsedSchema,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Variation>,
}

impl SchemaGroupReport {
    fn of(index: usize, group: &SchemaGroup) -> Self {
        let direct = group.direct_members().cloned().unwrap_or_default();
        Self {
            index,
            fingerprint: group.fingerprint().digest(),
            file_count: group.file_count(),
            row_count_range: RowCountRange::of(group.row_counts()),
            files: direct.files,
            row_counts: direct.row_counts,
            total_size: direct.total_size,
            schema_info: group.representative().clone(),
            variations: group.variations().to_vec(),
        }
    }
}

/// Summarize every group in creation order. Group indices start at 1.
pub fn build_report(grouper: &SchemaGrouper) -> SchemaReport {
    let groups = grouper
        .groups()
        .iter()
        .enumerate()
        .map(|(i, group)| match group {
            Group::Schema(group) => GroupReport::Schema(SchemaGroupReport::of(i + 1, group)),
            Group::Error(group) => GroupReport::Error(ErrorGroupReport {
                index: i + 1,
                error: group.error.clone(),
                files: group.files.clone(),
            }),
        })
        .collect();

    SchemaReport {
        generated_at: Utc::now(),
        similarity_threshold: grouper.similarity_threshold(),
        total_files: grouper.total_files(),
        groups,
    }
}

/// Plain-text "Schema Group Report".
pub fn render_text(report: &SchemaReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_text(&mut out, report);
    out
}

fn write_text(out: &mut String, report: &SchemaReport) -> fmt::Result {
    writeln!(out, "Schema Group Report\n{}\n", "=".repeat(50))?;
    writeln!(
        out,
        "Generated: {}\nSimilarity threshold: {}\nFiles: {}\n",
        report.generated_at.to_rfc3339(),
        report.similarity_threshold,
        report.total_files
    )?;

    for group in &report.groups {
        match group {
            GroupReport::Error(group) => write_error_group(out, group)?,
            GroupReport::Schema(group) => write_schema_group(out, group)?,
        }
    }
    Ok(())
}

fn write_error_group(out: &mut String, group: &ErrorGroupReport) -> fmt::Result {
    writeln!(out, "Error Group {} ({} files):", group.index, group.files.len())?;
    writeln!(out, "  Error: {}", group.error)?;
    writeln!(out, "  Files:")?;
    for file in &group.files {
        writeln!(out, "    - {}", file)?;
    }
    writeln!(out)
}

fn write_schema_group(out: &mut String, group: &SchemaGroupReport) -> fmt::Result {
    let metadata = &group.schema_info.metadata;
    writeln!(out, "Schema Group {} ({} files):", group.index, group.file_count)?;
    writeln!(out, "  Fingerprint: {}", group.fingerprint)?;

    if !group.files.is_empty() {
        writeln!(out, "  Base Schema Stats:")?;
        write_member_stats(out, &group.files, &group.row_counts, group.total_size, "    ")?;
    }

    writeln!(out, "  Columns: {}", metadata.num_columns)?;
    let codecs: Vec<&str> = metadata.compression_codecs.iter().map(String::as_str).collect();
    writeln!(out, "  Compression: {}", codecs.join(", "))?;
    writeln!(out, "  Masked Columns: {}", metadata.masked_columns_count)?;
    writeln!(
        out,
        "  High Cardinality Columns: {}",
        metadata.high_cardinality_columns
    )?;
    // Unbranched groups already show their range under the base stats.
    if !group.variations.is_empty() {
        if let Some(range) = group.row_count_range {
            writeln!(
                out,
                "  Row Count Range: {} - {}",
                group_digits(range.min),
                group_digits(range.max)
            )?;
        }
    }

    writeln!(out, "  Column Details:")?;
    for column in &group.schema_info.columns {
        let mask = if column.is_masked() { " [MASKED]" } else { "" };
        writeln!(out, "    {} ({}){}", column.name, column.data_type, mask)?;
        if let Some(ratio) = column.cardinality_ratio().filter(|_| column.is_string) {
            writeln!(out, "      cardinality: {:.2}%", ratio * 100.0)?;
        }
    }

    if !group.variations.is_empty() {
        writeln!(out, "  Variations: {}", group.variations.len())?;
        for (i, variation) in group.variations.iter().enumerate() {
            let members = &variation.members;
            writeln!(out, "    Variation {} ({} files):", i, members.files.len())?;
            write_member_stats(
                out,
                &members.files,
                &members.row_counts,
                members.total_size,
                "      ",
            )?;
            if let Some(diff) = &variation.differences {
                if !diff.added.is_empty() {
                    writeln!(out, "      Added: {}", describe_columns(&diff.added))?;
                }
                if !diff.removed.is_empty() {
                    writeln!(out, "      Removed: {}", describe_columns(&diff.removed))?;
                }
            }
        }
    }
    writeln!(out)
}

fn write_member_stats(
    out: &mut String,
    files: &[String],
    row_counts: &[u64],
    total_size: u64,
    indent: &str,
) -> fmt::Result {
    writeln!(out, "{}Files: {}", indent, files.len())?;
    writeln!(out, "{}Total Size: {} bytes", indent, group_digits(total_size))?;
    if let Some(range) = RowCountRange::of(row_counts.iter().copied()) {
        writeln!(
            out,
            "{}Row Count Range: {} - {}",
            indent,
            group_digits(range.min),
            group_digits(range.max)
        )?;
    }
    Ok(())
}

fn describe_columns(columns: &[ColumnInfo]) -> String {
    columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.data_type))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `1234567` → `1,234,567`.
fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Serialize)]
struct AssignmentRow<'a> {
    group: usize,
    variation: Option<usize>,
    kind: &'static str,
    key: String,
    path: &'a str,
    num_rows: Option<u64>,
}

/// One CSV row per file: which group (and variation) it landed in.
pub fn write_assignments_csv<W: Write>(grouper: &SchemaGrouper, writer: W) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    for (i, group) in grouper.groups().iter().enumerate() {
        match group {
            Group::Error(group) => {
                for path in &group.files {
                    wtr.serialize(AssignmentRow {
                        group: i + 1,
                        variation: None,
                        kind: "error",
                        key: group.error.clone(),
                        path,
                        num_rows: None,
                    })?;
                }
            }
            Group::Schema(group) => {
                let key = group.fingerprint().digest();
                let member_sets: Vec<(Option<usize>, &Members)> = match group.direct_members() {
                    Some(members) => vec![(None, members)],
                    None => group
                        .variations()
                        .iter()
                        .enumerate()
                        .map(|(v, variation)| (Some(v), &variation.members))
                        .collect(),
                };
                for (variation, members) in member_sets {
                    for (path, rows) in members.files.iter().zip(&members.row_counts) {
                        wtr.serialize(AssignmentRow {
                            group: i + 1,
                            variation,
                            kind: "schema",
                            key: key.clone(),
                            path,
                            num_rows: Some(*rows),
                        })?;
                    }
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(report: &SchemaReport, mut writer: W) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

/// Write every requested format and return the report that was rendered.
pub fn write_reports(grouper: &SchemaGrouper, outputs: &ReportOutputs) -> Result<SchemaReport, Error> {
    let report = build_report(grouper);

    if let Some(path) = &outputs.text {
        fs::write(path, render_text(&report))?;
        info!("Report saved to {}", path.display());
    }

    if let Some(path) = &outputs.json {
        write_json(&report, BufWriter::new(File::create(path)?))?;
        info!("JSON report saved to {}", path.display());
    }

    if let Some(path) = &outputs.csv {
        write_assignments_csv(grouper, BufWriter::new(File::create(path)?))?;
        info!("File assignments saved to {}", path.display());
    }

    Ok(report)
}
