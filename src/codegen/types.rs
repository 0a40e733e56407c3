//! SQL Server to Rust type mapping.

use std::collections::BTreeMap;

/// Maps catalog type names to Rust types. User overrides from the
/// `TypeMappings` section of mappings.yaml take precedence over the
/// built-in table; lookups are case-insensitive and ignore any
/// parenthesized length suffix (`NVARCHAR(50)` maps like `nvarchar`).
#[derive(Debug, Default)]
pub struct TypeMapper {
    overrides: BTreeMap<String, String>,
}

impl TypeMapper {
    pub fn new() -> Self {
        TypeMapper::default()
    }

    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        TypeMapper {
            overrides: overrides
                .iter()
                .map(|(sql, rust)| (sql.to_ascii_lowercase(), rust.clone()))
                .collect(),
        }
    }

    /// Rust type for a column; nullable columns wrap in `Option<..>`.
    pub fn rust_type(&self, sql_type: &str, nullable: bool) -> String {
        let base = self.base_type(sql_type);
        if nullable {
            format!("Option<{base}>")
        } else {
            base
        }
    }

    fn base_type(&self, sql_type: &str) -> String {
        let bare = sql_type.split('(').next().unwrap_or(sql_type).trim();
        let lower = bare.to_ascii_lowercase();
        if let Some(mapped) = self.overrides.get(&lower) {
            return mapped.clone();
        }
        let builtin = match lower.as_str() {
            "bigint" => "i64",
            "int" => "i32",
            "smallint" => "i16",
            "tinyint" => "u8",
            "bit" => "bool",
            "float" => "f64",
            "real" => "f32",
            "decimal" | "numeric" | "money" | "smallmoney" => "f64",
            "char" | "nchar" | "varchar" | "nvarchar" | "text" | "ntext" | "xml" | "sysname"
            | "uniqueidentifier" => "String",
            // Temporal values cross the wire as ISO-8601 text.
            "date" | "time" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => {
                "String"
            }
            "binary" | "varbinary" | "image" | "timestamp" | "rowversion" => "Vec<u8>",
            other => {
                tracing::warn!("no Rust mapping for SQL type '{other}', using String");
                "String"
            }
        };
        builtin.to_string()
    }
}
