//! Top-level generation settings loaded from `sqlgen.yaml`.
//!
//! The settings file is the only input whose absence is fatal: without it
//! there is nothing to generate and no place to put it. Everything inside a
//! database entry is optional; entries that name no schema source are skipped
//! at run time rather than rejected here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SqlGenError;

pub const DEFAULT_CONFIG_FILE: &str = "sqlgen.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root directory all per-database output paths resolve under.
    pub common_path: PathBuf,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// ADO-style connection string for live catalog reads.
    pub connection_string: Option<String>,
    /// Directory of `CREATE TABLE` scripts. When set, static mode wins over
    /// a configured connection string.
    pub sql_tables_path: Option<PathBuf>,
    /// Glob patterns narrowing static-mode file discovery; empty means a
    /// recursive scan for `.sql` files.
    #[serde(default)]
    pub include: Vec<String>,
    /// Directory holding `tables.yaml` / `mappings.yaml`.
    pub meta_path: Option<PathBuf>,
    #[serde(default)]
    pub paths: PathConfig,
}

/// Per-category output directories, relative to `common_path`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub table_path: String,
    pub procedure_path: String,
    pub extension_path: String,
    pub other_path: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        PathConfig {
            table_path: "tables".to_string(),
            procedure_path: "procedures".to_string(),
            extension_path: "extensions".to_string(),
            other_path: "other".to_string(),
        }
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, SqlGenError> {
    if !path.is_file() {
        return Err(SqlGenError::ConfigMissing {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|source| SqlGenError::ConfigReadError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| SqlGenError::ConfigParseError {
        path: path.to_path_buf(),
        source,
    })
}
