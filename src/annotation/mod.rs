//! Stored-procedure result annotations.
//!
//! Procedure bodies declare their result-set shape in a
//! `-- Results: <declaration>` comment. Four declaration forms exist:
//!
//! - `Procedure:<name>` — reuse a nested procedure's resolved columns
//! - `Table:<name>` — every column of one table
//! - `Custom:<name>:<type>,...` — free-form column list
//! - `<table> <alias>, <table> <alias>` — joined tables, matched against the
//!   first `SELECT ... FROM` clause after the annotation
//!
//! All text scanning is regex-based and confined to this module, so a real
//! SQL parser could take over without touching the resolver or the readers.

pub mod resolver;

use std::sync::LazyLock;

use regex::Regex;

use crate::util::starts_with_ci;

static RESULTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)--\s*Results:\s*(.+)").unwrap());
static RETURN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)RETURN\s+-?\d+").unwrap());
static SELECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)SELECT\s+(.+?)\s+FROM").unwrap());
static COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\w+)\.\[?(\w+)\]?(?:\s+AS\s+\[?(\w+)\]?)?").unwrap());

/// A parsed `-- Results:` declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsDeclaration {
    /// `Procedure:<name>` — reuse the named nested procedure's columns.
    Procedure(String),
    /// `Table:<name>` — all columns of the named table.
    Table(String),
    /// `Custom:<name>:<type>,...` — free-form columns in declared order.
    Custom(Vec<CustomColumn>),
    /// Comma-joined `<table> <alias>` list.
    Joined(Vec<TableAlias>),
    /// Text matching no known form.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomColumn {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAlias {
    pub table: String,
    pub alias: String,
}

/// One qualified column reference inside a SELECT clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub table_alias: String,
    pub column_name: String,
    /// Effective output name: the `AS` alias when present, else the column.
    pub output_name: String,
}

/// Find the `-- Results:` annotation in a procedure body. Returns the byte
/// offset of the comment and the trimmed declaration text.
pub fn find_results_declaration(definition: &str) -> Option<(usize, String)> {
    let caps = RESULTS_RE.captures(definition)?;
    let whole = caps.get(0)?;
    let decl = caps.get(1)?.as_str().trim().to_string();
    Some((whole.start(), decl))
}

/// True when the body contains a literal `RETURN <int>` statement.
pub fn has_return_statement(definition: &str) -> bool {
    RETURN_RE.is_match(definition)
}

/// Classify and parse a declaration. Prefix forms are checked before the
/// comma heuristic so a multi-column `Custom:` list never reads as a join
/// list. Returns the declaration plus any entry-level problems to log.
pub fn parse_declaration(decl: &str) -> (ResultsDeclaration, Vec<String>) {
    let decl = decl.trim();
    let mut issues = Vec::new();

    if decl.is_empty() {
        return (ResultsDeclaration::Invalid(String::new()), issues);
    }
    if starts_with_ci(decl, "Procedure:") {
        let name = decl["Procedure:".len()..].trim().to_string();
        return (ResultsDeclaration::Procedure(name), issues);
    }
    if starts_with_ci(decl, "Table:") {
        let name = decl["Table:".len()..].trim().to_string();
        return (ResultsDeclaration::Table(name), issues);
    }
    if starts_with_ci(decl, "Custom:") {
        let mut columns = Vec::new();
        for entry in decl["Custom:".len()..].trim().split(',') {
            let parts: Vec<&str> = entry.split(':').collect();
            if parts.len() == 2 {
                columns.push(CustomColumn {
                    name: parts[0].trim().to_string(),
                    data_type: parts[1].trim().to_string(),
                });
            } else {
                issues.push(format!("invalid custom column definition: {}", entry.trim()));
            }
        }
        return (ResultsDeclaration::Custom(columns), issues);
    }
    if decl.contains(',') {
        let mut mappings = Vec::new();
        for part in decl.split(',') {
            // Entries that are not `<table> <alias>` are ignored.
            let mut tokens = part.split_whitespace();
            if let (Some(table), Some(alias)) = (tokens.next(), tokens.next()) {
                mappings.push(TableAlias {
                    table: table.to_string(),
                    alias: alias.to_string(),
                });
            }
        }
        return (ResultsDeclaration::Joined(mappings), issues);
    }
    (ResultsDeclaration::Invalid(decl.to_string()), issues)
}

/// Extract qualified column references from the first `SELECT ... FROM`
/// clause in `text`. Callers pass the body sliced from the annotation
/// onward so the scan picks up the statement the annotation describes.
pub fn parse_select_columns(text: &str) -> Vec<SelectColumn> {
    let clause = match SELECT_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => return Vec::new(),
    };

    COLUMN_RE
        .captures_iter(&clause)
        .map(|caps| {
            let column_name = caps[2].to_string();
            let output_name = caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| column_name.clone());
            SelectColumn {
                table_alias: caps[1].to_string(),
                column_name,
                output_name,
            }
        })
        .collect()
}
