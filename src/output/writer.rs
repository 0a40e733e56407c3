//! Category-directory reconciliation and diff-aware writes.
//!
//! Each output category directory is wholly owned by the generator: files
//! whose normalized content is unchanged are left untouched, changed or new
//! files are written, and files a previous run produced but this run did not
//! are removed. One failing file never aborts the batch.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::codegen::{CodeKind, GeneratedFile};
use crate::error::SqlGenError;

/// Destination directory per category.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub table_dir: PathBuf,
    pub procedure_dir: PathBuf,
    pub extension_dir: PathBuf,
    pub other_dir: PathBuf,
}

impl OutputLayout {
    pub fn dir_for(&self, kind: CodeKind) -> &Path {
        match kind {
            CodeKind::Table => &self.table_dir,
            CodeKind::StoredProcedure => &self.procedure_dir,
            CodeKind::TableValueParameter | CodeKind::Extension => &self.extension_dir,
        }
    }
}

/// Per-run write accounting.
#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub generated: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl WriteReport {
    pub fn merge(&mut self, other: WriteReport) {
        self.generated.extend(other.generated);
        self.unchanged.extend(other.unchanged);
        self.failed.extend(other.failed);
        self.removed.extend(other.removed);
    }
}

/// Write one run's files. `active` names the categories this run owns;
/// only those are swept for stale leftovers, so a mode that never produces
/// procedure wrappers leaves the procedure directory alone.
pub fn write_files(
    layout: &OutputLayout,
    active: &[CodeKind],
    files: &[GeneratedFile],
) -> WriteReport {
    let mut report = WriteReport::default();
    let mut produced: HashSet<PathBuf> = HashSet::new();

    for file in files {
        let dir = layout.dir_for(file.kind);
        let path = dir.join(&file.file_name);
        if let Err(source) = fs::create_dir_all(dir) {
            let err = SqlGenError::WriteError {
                path: path.clone(),
                source,
            };
            tracing::error!("{err}");
            report.failed.push(path.clone());
            produced.insert(path);
            continue;
        }

        produced.insert(path.clone());
        match fs::read_to_string(&path) {
            Ok(existing) if normalize_content(&existing) == normalize_content(&file.content) => {
                tracing::debug!("unchanged: {}", path.display());
                report.unchanged.push(path);
            }
            _ => match fs::write(&path, &file.content) {
                Ok(()) => {
                    tracing::debug!("generated: {}", path.display());
                    report.generated.push(path);
                }
                Err(source) => {
                    let err = SqlGenError::WriteError {
                        path: path.clone(),
                        source,
                    };
                    tracing::error!("{err}");
                    report.failed.push(path);
                }
            },
        }
    }

    for kind in dedup_dirs(layout, active) {
        sweep_stale(kind, &produced, &mut report);
    }

    report
}

/// Directories to sweep, deduplicated (two kinds share the extension dir).
fn dedup_dirs<'a>(layout: &'a OutputLayout, active: &[CodeKind]) -> Vec<&'a Path> {
    let mut dirs: Vec<&Path> = Vec::new();
    for kind in active {
        let dir = layout.dir_for(*kind);
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// Remove files a previous run left behind in a directory this run owns.
fn sweep_stale(dir: &Path, produced: &HashSet<PathBuf>, report: &mut WriteReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // Nothing to sweep when the directory was never created.
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || produced.contains(&path) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("removed stale: {}", path.display());
                report.removed.push(path);
            }
            Err(err) => {
                tracing::warn!("failed to remove stale file {}: {err}", path.display());
            }
        }
    }
}

/// Line-ending and outer-whitespace normalization used for change detection.
pub fn normalize_content(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}
