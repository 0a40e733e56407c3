//! Console summary of a generation run.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::writer::WriteReport;

/// Render the run report as console text. Freshly written files are listed
/// grouped by output directory, shown relative to `common_root` where
/// possible; a counts line closes the report.
pub fn render_summary(common_root: &Path, report: &WriteReport, skipped: usize) -> String {
    let mut out = String::new();

    if report.generated.is_empty() {
        out.push_str("No files were generated.\n");
    } else {
        let _ = writeln!(out, "Successfully generated {} files:", report.generated.len());
        out.push('\n');

        let mut groups: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for path in &report.generated {
            let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            groups.entry(dir).or_default().push(name);
        }

        for (dir, mut names) in groups {
            let display = dir.strip_prefix(common_root).unwrap_or(&dir);
            let _ = writeln!(out, "{}", display.display());
            names.sort();
            for name in names {
                let _ = writeln!(out, "  {name}");
            }
            out.push('\n');
        }
    }

    let _ = writeln!(
        out,
        "{} generated, {} unchanged, {} skipped by policy, {} failed, {} stale removed",
        report.generated.len(),
        report.unchanged.len(),
        skipped,
        report.failed.len(),
        report.removed.len()
    );
    out
}
