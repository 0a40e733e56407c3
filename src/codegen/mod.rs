//! Code generation from schema and metadata.
//!
//! Generators are pure: schema plus resolved metadata in, [`GeneratedFile`]s
//! out. Writing to disk is the output module's business, so every generator
//! here stays deterministic and timestamp-free — identical inputs must yield
//! byte-identical content on every run.

pub mod dto;
pub mod entity;
pub mod procedure;
pub mod types;

use crate::util::snake_case;

/// Routing category for a generated file; decides the output subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Table,
    StoredProcedure,
    TableValueParameter,
    Extension,
}

/// One generated source file, not yet written to disk.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub file_name: String,
    pub content: String,
    pub kind: CodeKind,
    pub database: String,
}

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// Generated by sqlgen. Do not edit.";

/// Rust field identifier for a SQL column or parameter name. Keywords are
/// raw-escaped; the few that cannot be get a trailing underscore.
pub(crate) fn field_ident(name: &str) -> String {
    let ident = snake_case(name);
    match ident.as_str() {
        "self" | "super" | "crate" => format!("{ident}_"),
        _ if RUST_KEYWORDS.contains(&ident.as_str()) => format!("r#{ident}"),
        _ => ident,
    }
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
    "where", "while", "yield",
];

/// Catalog type plus its length or precision, for doc comments
/// (`nvarchar(50)`, `decimal(18,2)`, `varbinary(max)`).
pub(crate) fn sql_type_display(
    data_type: &str,
    char_max_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> String {
    let mut display = data_type.to_string();
    if let Some(length) = char_max_length {
        if length < 0 {
            display.push_str("(max)");
        } else {
            display.push_str(&format!("({length})"));
        }
    } else if let (Some(p), Some(s)) = (precision, scale) {
        if data_type.eq_ignore_ascii_case("decimal") || data_type.eq_ignore_ascii_case("numeric") {
            display.push_str(&format!("({p},{s})"));
        }
    }
    display
}
