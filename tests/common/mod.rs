//! Common test utilities for sqlgen tests

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sqlgen::{GenerateOptions, RunReport};

/// Test context with temporary directory for isolated generation runs
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub root: PathBuf,
    /// Database key written into the settings file
    database: String,
}

impl TestContext {
    /// Create a context with an empty DDL directory for the given database key
    pub fn new(database: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        fs::create_dir_all(root.join("Tables")).expect("Failed to create Tables directory");

        Self {
            _temp_dir: temp_dir,
            root,
            database: database.to_string(),
        }
    }

    /// Write one DDL file into the schema directory
    pub fn add_sql(&self, file_name: &str, content: &str) {
        fs::write(self.root.join("Tables").join(file_name), content)
            .expect("Failed to write DDL file");
    }

    /// Remove a DDL file, as if the table had been dropped from the schema
    pub fn remove_sql(&self, file_name: &str) {
        fs::remove_file(self.root.join("Tables").join(file_name))
            .expect("Failed to remove DDL file");
    }

    /// Write a metadata document (tables.yaml / mappings.yaml) into the
    /// metadata directory, creating it on first use
    pub fn add_metadata(&self, file_name: &str, content: &str) {
        let meta = self.root.join("meta");
        fs::create_dir_all(&meta).expect("Failed to create metadata directory");
        fs::write(meta.join(file_name), content).expect("Failed to write metadata file");
    }

    /// Write a settings file for this context's database and return its path.
    ///
    /// `with_meta` points the database entry at the context's metadata
    /// directory, switching the run into metadata mode.
    pub fn write_settings(&self, with_meta: bool) -> PathBuf {
        let mut yaml = format!(
            "common_path: \"{}\"\ndatabases:\n  {}:\n    sql_tables_path: \"{}\"\n",
            self.out_dir().display(),
            self.database,
            self.root.join("Tables").display()
        );
        if with_meta {
            yaml.push_str(&format!(
                "    meta_path: \"{}\"\n",
                self.root.join("meta").display()
            ));
        }
        self.write_settings_yaml(&yaml)
    }

    /// Write an arbitrary settings document and return its path
    pub fn write_settings_yaml(&self, yaml: &str) -> PathBuf {
        let path = self.root.join("sqlgen.yaml");
        fs::write(&path, yaml).expect("Failed to write settings file");
        path
    }

    /// Run generation against this context's settings
    pub fn generate(&self, with_meta: bool) -> GenerateResult {
        let config_path = self.write_settings(with_meta);

        match sqlgen::run_generation(GenerateOptions {
            config_path,
            database: None,
            verbose: false,
        }) {
            Ok(report) => GenerateResult {
                success: true,
                report: Some(report),
                errors: vec![],
            },
            Err(e) => GenerateResult {
                success: false,
                report: None,
                errors: vec![e.to_string()],
            },
        }
    }

    /// Run generation and return the report, panicking if the run fails.
    ///
    /// This is a convenience method that combines generate + assert + unwrap:
    /// ```rust,ignore
    /// let result = ctx.generate(false);
    /// assert!(result.success, "Run failed: {:?}", result.errors);
    /// let report = result.report.unwrap();
    /// ```
    pub fn generate_successfully(&self, with_meta: bool) -> RunReport {
        let result = self.generate(with_meta);
        assert!(
            result.success,
            "Generation failed for '{}': {:?}",
            self.database, result.errors
        );
        result.report.expect("Run succeeded but produced no report")
    }

    /// Root the generated categories are written under
    pub fn out_dir(&self) -> PathBuf {
        self.root.join("out")
    }

    pub fn table_dir(&self) -> PathBuf {
        self.out_dir().join("tables")
    }

    pub fn procedure_dir(&self) -> PathBuf {
        self.out_dir().join("procedures")
    }

    pub fn extension_dir(&self) -> PathBuf {
        self.out_dir().join("extensions")
    }
}

/// Result of a generation run
#[derive(Debug)]
pub struct GenerateResult {
    pub success: bool,
    pub report: Option<RunReport>,
    pub errors: Vec<String>,
}

/// File names collected from a generation output tree
#[derive(Debug, Default)]
pub struct OutputInfo {
    pub tables: Vec<String>,
    pub procedures: Vec<String>,
    pub extensions: Vec<String>,
}

impl OutputInfo {
    /// Scan a context's output root and collect generated file names per category
    pub fn from_output(ctx: &TestContext) -> Self {
        OutputInfo {
            tables: list_files(&ctx.table_dir()),
            procedures: list_files(&ctx.procedure_dir()),
            extensions: list_files(&ctx.extension_dir()),
        }
    }
}

/// Sorted file names in a directory; empty when the directory does not exist
pub fn list_files(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Read one generated file out of a category directory
pub fn read_generated(dir: &Path, file_name: &str) -> String {
    fs::read_to_string(dir.join(file_name))
        .unwrap_or_else(|e| panic!("Failed to read generated file '{}': {}", file_name, e))
}

/// Assert that a category listing contains a specific generated file
#[macro_export]
macro_rules! assert_output_contains {
    ($files:expr, $name:expr) => {
        assert!(
            $files.iter().any(|f| f == $name),
            "Expected output to contain '{}', found: {:?}",
            $name,
            $files
        );
    };
}

/// Assert that a category listing does not contain a specific generated file
#[macro_export]
macro_rules! assert_output_not_contains {
    ($files:expr, $name:expr) => {
        assert!(
            !$files.iter().any(|f| f == $name),
            "Expected output to NOT contain '{}', but found: {:?}",
            $name,
            $files
        );
    };
}
