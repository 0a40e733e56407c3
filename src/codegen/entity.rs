//! Entity struct generation from table schemas.

use crate::metadata::TablesMetadata;
use crate::schema::{ColumnSchema, TableSchema};
use crate::util::snake_case;

use super::types::TypeMapper;
use super::{field_ident, sql_type_display, CodeKind, GeneratedFile, GENERATED_HEADER};

/// Outcome of an entity pass over the schema's tables.
#[derive(Debug, Default)]
pub struct EntityGeneration {
    pub files: Vec<GeneratedFile>,
    /// Tables the metadata policy said no to.
    pub skipped: Vec<String>,
}

/// Generate one entity file per approved table. Without metadata every table
/// is approved under the default `<Table>Entity` name; with metadata the
/// per-table policy decides approval, struct name, and column exclusions.
pub fn generate_entities(
    database: &str,
    tables: &[TableSchema],
    metadata: Option<&TablesMetadata>,
    mapper: &TypeMapper,
) -> EntityGeneration {
    let mut generation = EntityGeneration::default();

    for table in tables {
        let (approved, configured_name, excluded) = match metadata {
            Some(meta) => (
                meta.should_generate_entity(&table.table_name),
                meta.entity_struct_name(&table.table_name),
                meta.excluded_columns(&table.table_name),
            ),
            None => (true, None, None),
        };
        if !approved {
            tracing::debug!("entity generation disabled for table {}", table.table_name);
            generation.skipped.push(table.table_name.clone());
            continue;
        }
        let struct_name =
            configured_name.unwrap_or_else(|| format!("{}Entity", table.table_name));
        generation
            .files
            .push(entity_file(database, table, &struct_name, excluded, mapper));
    }

    generation
}

fn entity_file(
    database: &str,
    table: &TableSchema,
    struct_name: &str,
    excluded: Option<&[String]>,
    mapper: &TypeMapper,
) -> GeneratedFile {
    let qualified = format!("{}.{}", table.schema, table.table_name);
    let columns: Vec<&ColumnSchema> = table
        .columns
        .iter()
        .filter(|c| !is_excluded(excluded, &c.column_name))
        .collect();

    let mut content = String::new();
    content.push_str(GENERATED_HEADER);
    content.push('\n');
    content.push_str(&format!("//\n// {qualified} ({database})\n\n"));

    content.push_str(&format!("/// Row of `{qualified}`.\n"));
    content.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
    content.push_str(&format!("pub struct {struct_name} {{\n"));
    for column in &columns {
        content.push_str(&format!(
            "    /// `{}` {}, {}\n",
            column.column_name,
            sql_type_display(
                &column.data_type,
                column.character_maximum_length,
                column.numeric_precision,
                column.numeric_scale,
            ),
            if column.is_nullable { "null" } else { "not null" },
        ));
        content.push_str(&format!(
            "    pub {}: {},\n",
            field_ident(&column.column_name),
            mapper.rust_type(&column.data_type, column.is_nullable),
        ));
    }
    content.push_str("}\n\n");

    content.push_str(&format!("impl {struct_name} {{\n"));
    content.push_str(&format!(
        "    pub const TABLE: &'static str = \"{qualified}\";\n"
    ));
    let column_list = columns
        .iter()
        .map(|c| format!("\"{}\"", c.column_name))
        .collect::<Vec<_>>()
        .join(", ");
    content.push_str(&format!(
        "    pub const COLUMNS: &'static [&'static str] = &[{column_list}];\n"
    ));
    content.push_str("}\n");

    GeneratedFile {
        file_name: format!("{}.rs", snake_case(struct_name)),
        content,
        kind: CodeKind::Table,
        database: database.to_string(),
    }
}

fn is_excluded(excluded: Option<&[String]>, column_name: &str) -> bool {
    excluded
        .map(|list| list.iter().any(|e| e.eq_ignore_ascii_case(column_name)))
        .unwrap_or(false)
}
