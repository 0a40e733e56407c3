//! Schema reader over a directory of SQL DDL files.
//!
//! Reads `CREATE TABLE` statements with sqlparser's MS SQL dialect and
//! produces the same normalized [`DatabaseSchema`] shape as the live catalog
//! reader, so the generators never know which source fed them. Procedures
//! are not recoverable from DDL alone; the list is always empty here.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sqlparser::ast::{
    CharacterLength, ColumnDef, ColumnOption, CreateTable, DataType, ExactNumberInfo, ObjectName,
    Statement,
};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

use super::{
    is_table_included, ColumnCatalog, ColumnSchema, DatabaseSchema, ResultColumnSchema,
    SchemaReader, TableIndex, TableSchema,
};
use crate::error::SqlGenError;

const DEFAULT_SCHEMA: &str = "dbo";

/// Stand-in for `MAX` in binary types; sqlparser only accepts a number there.
/// Must stay in sync with the literal in [`BINARY_MAX_RE`]'s replacement.
const BINARY_MAX_SENTINEL: u64 = 2_147_483_647;

static BINARY_MAX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(var)?binary\s*\(\s*max\s*\)").unwrap());

/// A SQL batch with its content and source location
struct Batch<'a> {
    content: &'a str,
    start_line: usize, // 1-based line number
}

/// Reads table definitions from `.sql` files under a root directory.
pub struct SqlFileSchemaReader {
    database_name: String,
    root: PathBuf,
    /// Glob patterns relative to `root`; empty means every `.sql` file.
    include: Vec<String>,
    index: TableIndex,
}

impl SqlFileSchemaReader {
    pub fn new(database_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        SqlFileSchemaReader {
            database_name: database_name.into(),
            root: root.into(),
            include: Vec::new(),
            index: TableIndex::default(),
        }
    }

    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    fn discover_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if self.include.is_empty() {
            if !self.root.is_dir() {
                tracing::warn!("sql tables path is not a directory: {}", self.root.display());
                return files;
            }
            for entry in walkdir::WalkDir::new(&self.root)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "sql") {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            for pattern in &self.include {
                let full = self.root.join(pattern);
                let full = full.to_string_lossy();
                match glob::glob(&full) {
                    Ok(paths) => {
                        for entry in paths.filter_map(|p| p.ok()) {
                            if entry.extension().map_or(false, |ext| ext == "sql") {
                                files.push(entry);
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!("invalid include pattern {pattern}: {err}");
                    }
                }
            }
        }
        files.sort();
        files.dedup();
        files
    }
}

impl SchemaReader for SqlFileSchemaReader {
    fn read_schema(&mut self) -> Result<DatabaseSchema, SqlGenError> {
        let files = self.discover_files();
        tracing::debug!(
            "parsing {} sql files under {}",
            files.len(),
            self.root.display()
        );

        let mut retained = Vec::new();
        for file in &files {
            let tables = match parse_tables_from_file(file) {
                Ok(tables) => tables,
                Err(err) => {
                    tracing::warn!("{err}");
                    continue;
                }
            };
            for table in tables {
                if is_table_included(&table.schema, &table.table_name) {
                    retained.push(table.clone());
                }
                // Every parsed table stays addressable for annotation lookups,
                // filtered or not.
                self.index.insert(table);
            }
        }
        retained.sort_by(|a, b| a.table_name.cmp(&b.table_name));

        Ok(DatabaseSchema {
            database_name: self.database_name.clone(),
            tables: retained,
            procedures: Vec::new(),
        })
    }
}

impl ColumnCatalog for SqlFileSchemaReader {
    fn table_columns(
        &mut self,
        table_name: &str,
    ) -> Result<Option<Vec<ColumnSchema>>, SqlGenError> {
        self.index.table_columns(table_name)
    }

    fn table_column(
        &mut self,
        table_name: &str,
        column_name: &str,
    ) -> Result<Option<ResultColumnSchema>, SqlGenError> {
        self.index.table_column(table_name, column_name)
    }
}

/// Parse one DDL file into table schemas. Read failures are errors; a batch
/// that does not parse is logged and skipped so one bad file section cannot
/// sink the rest.
fn parse_tables_from_file(path: &Path) -> Result<Vec<TableSchema>, SqlGenError> {
    let content = read_sql_file(path)?;
    let dialect = MsSqlDialect {};
    let mut tables = Vec::new();

    for batch in split_batches(&content) {
        let trimmed = batch.content.trim();
        if trimmed.is_empty() {
            continue;
        }
        let prepared = prepare_batch(trimmed);

        match Parser::parse_sql(&dialect, &prepared) {
            Ok(statements) => {
                for statement in statements {
                    if let Statement::CreateTable(create) = statement {
                        tables.push(table_from_create(&create));
                    }
                }
            }
            Err(err) => {
                let message = err.to_string();
                let relative_line = parse_error_line(&message).unwrap_or(1);
                let parse_err = SqlGenError::SqlParseError {
                    path: path.to_path_buf(),
                    line: batch.start_line + relative_line - 1,
                    message,
                };
                tracing::warn!("skipping unparseable batch: {parse_err}");
            }
        }
    }

    Ok(tables)
}

/// Read a file as a string, trying UTF-8 first, then Windows-1252 as fallback
fn read_sql_file(path: &Path) -> Result<String, SqlGenError> {
    let bytes = std::fs::read(path).map_err(|source| SqlGenError::SqlFileReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(err) => {
            // Windows-era DDL files are often code-page encoded.
            let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(err.as_bytes());
            if had_errors {
                return Err(SqlGenError::SqlFileReadError {
                    path: path.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidData,
                        "file is neither UTF-8 nor Windows-1252",
                    ),
                });
            }
            decoded.into_owned()
        }
    };

    match content.strip_prefix('\u{FEFF}') {
        Some(stripped) => Ok(stripped.to_string()),
        None => Ok(content),
    }
}

/// Rewrite `BINARY(MAX)`/`VARBINARY(MAX)` to the numeric sentinel so the
/// batch parses; [`extract_type_params`] maps the sentinel back to `-1`.
fn prepare_batch(sql: &str) -> Cow<'_, str> {
    BINARY_MAX_RE.replace_all(sql, "${1}binary(2147483647)")
}

/// Split on GO separators; GO counts only on its own line (`GO;` included).
fn split_batches(content: &str) -> Vec<Batch<'_>> {
    let mut batches = Vec::new();
    let mut pos = 0;
    let mut batch_start = 0;
    let mut line = 1; // 1-based line numbers
    let mut batch_start_line = 1;

    for raw_line in content.lines() {
        let line_end = pos + raw_line.len();
        let next_pos = if content[line_end..].starts_with("\r\n") {
            line_end + 2
        } else if content[line_end..].starts_with('\n') {
            line_end + 1
        } else {
            line_end // end of file, no newline
        };

        let trimmed = raw_line.trim();
        if trimmed.eq_ignore_ascii_case("go") || trimmed.eq_ignore_ascii_case("go;") {
            if pos > batch_start {
                batches.push(Batch {
                    content: &content[batch_start..pos],
                    start_line: batch_start_line,
                });
            }
            batch_start = next_pos;
            batch_start_line = line + 1;
        }

        pos = next_pos;
        line += 1;
    }

    if batch_start < content.len() {
        batches.push(Batch {
            content: &content[batch_start..],
            start_line: batch_start_line,
        });
    }

    batches
}

/// Extract line number from sqlparser error message (format: "... at Line: X, Column: Y")
fn parse_error_line(message: &str) -> Option<usize> {
    let re = Regex::new(r"Line:\s*(\d+)").ok()?;
    re.captures(message)?.get(1)?.as_str().parse().ok()
}

fn table_from_create(create: &CreateTable) -> TableSchema {
    let (schema, table_name) = schema_and_name(&create.name);
    let columns = create.columns.iter().map(column_from_def).collect();
    TableSchema {
        schema,
        table_name,
        columns,
    }
}

fn schema_and_name(name: &ObjectName) -> (String, String) {
    let parts: Vec<&str> = name.0.iter().map(|p| p.value.as_str()).collect();
    match parts.len() {
        2 => (parts[0].to_string(), parts[1].to_string()),
        _ => (
            DEFAULT_SCHEMA.to_string(),
            parts.last().copied().unwrap_or_default().to_string(),
        ),
    }
}

fn column_from_def(col: &ColumnDef) -> ColumnSchema {
    // Implicit nullability means NULL, as in the catalog.
    let mut is_nullable = true;
    for option in &col.options {
        match &option.option {
            ColumnOption::NotNull => is_nullable = false,
            ColumnOption::Null => is_nullable = true,
            _ => {}
        }
    }

    let (data_type, user_defined_type) = type_names(&col.data_type);
    let (character_maximum_length, numeric_precision, numeric_scale) =
        extract_type_params(&col.data_type);

    ColumnSchema {
        column_name: col.name.value.clone(),
        data_type,
        user_defined_type,
        is_nullable,
        character_maximum_length,
        numeric_precision,
        numeric_scale,
    }
}

/// Catalog-style lowercase type name plus the user-defined type name, if any.
fn type_names(data_type: &DataType) -> (String, Option<String>) {
    if let DataType::Custom(name, _) = data_type {
        let udt = name
            .0
            .last()
            .map(|p| p.value.clone())
            .unwrap_or_default();
        return (udt.to_ascii_lowercase(), Some(udt));
    }
    let display = data_type.to_string();
    let base = display.split('(').next().unwrap_or(&display).trim();
    (base.to_ascii_lowercase(), None)
}

/// (max_length, precision, scale) the way the catalog reports them: length
/// for character and binary types with `-1` for MAX, precision/scale for
/// decimal and numeric.
fn extract_type_params(data_type: &DataType) -> (Option<i32>, Option<i32>, Option<i32>) {
    match data_type {
        DataType::Varchar(len) | DataType::Char(len) | DataType::Nvarchar(len) => {
            let max_length = len.as_ref().map(|l| match l {
                CharacterLength::IntegerLength { length, .. } => *length as i32,
                CharacterLength::Max => -1,
            });
            (max_length, None, None)
        }
        DataType::Varbinary(len) | DataType::Binary(len) => {
            let max_length = len.map(|l| {
                if l == BINARY_MAX_SENTINEL {
                    -1
                } else {
                    l as i32
                }
            });
            (max_length, None, None)
        }
        DataType::Decimal(info) | DataType::Numeric(info) => {
            let (precision, scale) = match info {
                ExactNumberInfo::None => (None, None),
                ExactNumberInfo::Precision(p) => (Some(*p as i32), None),
                ExactNumberInfo::PrecisionAndScale(p, s) => (Some(*p as i32), Some(*s as i32)),
            };
            (None, precision, scale)
        }
        _ => (None, None, None),
    }
}
