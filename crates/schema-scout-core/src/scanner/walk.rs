use dashmap::DashMap;
use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Parallel directory traversal collecting `*.parquet` files, filtering by glob
/// ignore patterns. Skips symlinks and 0-byte files.
///
/// The result is sorted by path, which fixes the discovery order fed to the grouper.
pub fn find_parquet_files(
    root_paths: &[&str],
    ignore_globs: &[&str],
) -> io::Result<Vec<DiscoveredFile>> {
    let map: DashMap<PathBuf, u64> = DashMap::new();

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    root_paths.par_iter().try_for_each(|root| {
        let root = Path::new(root);
        if root.is_file() {
            visit_file(root, &map, &ignore_patterns)
        } else {
            visit_dirs(root, &map, &ignore_patterns)
        }
    })?;

    let mut files: Vec<DiscoveredFile> = map
        .into_iter()
        .map(|(path, size)| DiscoveredFile { path, size })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_ignored(path: &Path, ignore_patterns: &[Pattern]) -> bool {
    ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(path))
}

fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"))
}

fn visit_file(
    path: &Path,
    map: &DashMap<PathBuf, u64>,
    ignore_patterns: &[Pattern],
) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_file()
        && metadata.len() > 0
        && is_parquet(path)
        && !is_ignored(path, ignore_patterns)
    {
        map.insert(path.to_path_buf(), metadata.len());
    }
    Ok(())
}

fn visit_dirs(
    dir: &Path,
    map: &DashMap<PathBuf, u64>,
    ignore_patterns: &[Pattern],
) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    if is_ignored(dir, ignore_patterns) {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!(
                    "Access denied reading directory {}: {}",
                    dir.display(),
                    err
                );
                return Ok(());
            } else {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        }
    };

    entries.par_bridge().try_for_each(|entry_result| {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!(
                        "Error reading entry in directory {}: {}",
                        dir.display(),
                        err
                    ),
                ));
            }
        };

        let path = entry.path();
        // symlink_metadata so links are seen as links and skipped.
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!(
                        "Error getting metadata for {}: {}",
                        path.display(),
                        err
                    ),
                ));
            }
        };

        if metadata.is_dir() {
            visit_dirs(&path, map, ignore_patterns)?;
        } else if metadata.is_file() {
            visit_file(&path, map, ignore_patterns)?;
        }
        Ok(())
    })?;

    Ok(())
}
