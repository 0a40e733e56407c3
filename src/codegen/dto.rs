//! DTO and message composition from mappings metadata.
//!
//! DTOs project one or more tables into a single struct; messages are pure
//! property lists. Both route to the extension output directory.

use std::collections::HashMap;

use crate::metadata::{DtoConfig, MappingsMetadata, MessagePartConfig, PropertyConfig};
use crate::schema::{ColumnSchema, TableSchema};
use crate::util::snake_case;

use super::types::TypeMapper;
use super::{field_ident, sql_type_display, CodeKind, GeneratedFile, GENERATED_HEADER};

pub fn generate_dtos(
    database: &str,
    tables: &[TableSchema],
    mappings: &MappingsMetadata,
    mapper: &TypeMapper,
) -> Vec<GeneratedFile> {
    let dtos = match mappings.dtos.as_ref() {
        Some(dtos) => dtos,
        None => return Vec::new(),
    };
    let by_name: HashMap<String, &TableSchema> = tables
        .iter()
        .map(|t| (t.table_name.to_ascii_lowercase(), t))
        .collect();
    let module = mappings
        .output
        .as_ref()
        .map(|output| output.dto.as_str())
        .unwrap_or("");

    dtos.iter()
        .filter_map(|(name, config)| dto_file(database, module, name, config, &by_name, mapper))
        .collect()
}

fn dto_file(
    database: &str,
    module: &str,
    name: &str,
    config: &DtoConfig,
    tables: &HashMap<String, &TableSchema>,
    mapper: &TypeMapper,
) -> Option<GeneratedFile> {
    let mut fields = String::new();

    if config.custom {
        let properties = match config.properties.as_ref() {
            Some(properties) if !properties.is_empty() => properties,
            _ => {
                tracing::warn!("custom DTO '{name}' declares no properties, skipping");
                return None;
            }
        };
        for property in properties {
            push_property_field(&mut fields, property, mapper);
        }
    } else if let Some(sources) = config.sources.as_ref() {
        for source in sources {
            let table = match tables.get(&source.table.to_ascii_lowercase()) {
                Some(table) => table,
                None => {
                    tracing::warn!(
                        "DTO '{name}' references unknown table '{}', skipping source",
                        source.table
                    );
                    continue;
                }
            };
            for column in selected_columns(table, source.include.as_deref(), None) {
                push_column_field(&mut fields, column, &source.prefix, &table.table_name, mapper);
            }
        }
    } else if let Some(source) = config.source.as_ref() {
        let table = match tables.get(&source.to_ascii_lowercase()) {
            Some(table) => table,
            None => {
                tracing::warn!("DTO '{name}' references unknown table '{source}', skipping");
                return None;
            }
        };
        for column in selected_columns(table, config.include.as_deref(), config.exclude.as_deref())
        {
            push_column_field(&mut fields, column, "", &table.table_name, mapper);
        }
    } else {
        tracing::warn!("DTO '{name}' has no source, sources, or custom properties, skipping");
        return None;
    }

    if fields.is_empty() {
        tracing::warn!("DTO '{name}' resolved to no fields, skipping");
        return None;
    }

    let mut content = String::new();
    content.push_str(GENERATED_HEADER);
    content.push('\n');
    content.push_str(&format!("//\n// {name} ({database}){}\n\n", module_note(module)));
    if let Some(description) = config.description.as_ref() {
        content.push_str(&format!("/// {description}\n"));
    } else {
        content.push_str(&format!("/// `{name}` data transfer object.\n"));
    }
    content.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
    content.push_str(&format!("pub struct {name} {{\n"));
    content.push_str(&fields);
    content.push_str("}\n");

    Some(GeneratedFile {
        file_name: format!("{}.rs", snake_case(name)),
        content,
        kind: CodeKind::Extension,
        database: database.to_string(),
    })
}

/// Columns in table order, filtered by the include then the exclude list.
fn selected_columns<'a>(
    table: &'a TableSchema,
    include: Option<&[String]>,
    exclude: Option<&[String]>,
) -> Vec<&'a ColumnSchema> {
    table
        .columns
        .iter()
        .filter(|column| match include {
            Some(include) => include
                .iter()
                .any(|i| i.eq_ignore_ascii_case(&column.column_name)),
            None => true,
        })
        .filter(|column| match exclude {
            Some(exclude) => !exclude
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&column.column_name)),
            None => true,
        })
        .collect()
}

fn push_column_field(
    fields: &mut String,
    column: &ColumnSchema,
    prefix: &str,
    table_name: &str,
    mapper: &TypeMapper,
) {
    fields.push_str(&format!(
        "    /// `{}` {}, {} ({})\n",
        column.column_name,
        sql_type_display(
            &column.data_type,
            column.character_maximum_length,
            column.numeric_precision,
            column.numeric_scale,
        ),
        if column.is_nullable { "null" } else { "not null" },
        table_name,
    ));
    fields.push_str(&format!(
        "    pub {}: {},\n",
        field_ident(&format!("{prefix}{}", column.column_name)),
        mapper.rust_type(&column.data_type, column.is_nullable),
    ));
}

fn push_property_field(fields: &mut String, property: &PropertyConfig, mapper: &TypeMapper) {
    fields.push_str(&format!(
        "    /// `{}` {}\n",
        property.name, property.property_type
    ));
    fields.push_str(&format!(
        "    pub {}: {},\n",
        field_ident(&property.name),
        mapper.rust_type(&property.property_type, property.nullable),
    ));
}

fn module_note(module: &str) -> String {
    if module.is_empty() {
        String::new()
    } else {
        format!(", module: {module}")
    }
}

pub fn generate_messages(
    database: &str,
    mappings: &MappingsMetadata,
    mapper: &TypeMapper,
) -> Vec<GeneratedFile> {
    let messages = match mappings.messages.as_ref() {
        Some(messages) => messages,
        None => return Vec::new(),
    };
    let module = mappings
        .output
        .as_ref()
        .map(|output| output.message.as_str())
        .unwrap_or("");

    let mut files = Vec::new();
    for (name, config) in messages {
        let mut body = String::new();
        if let Some(request) = config.request.as_ref() {
            push_message_struct(&mut body, name, "Request", request, mapper);
        }
        if let Some(response) = config.response.as_ref() {
            if config.request.is_some() {
                body.push('\n');
            }
            push_message_struct(&mut body, name, "Response", response, mapper);
        }
        if body.is_empty() {
            tracing::warn!("message '{name}' declares neither request nor response, skipping");
            continue;
        }

        let mut content = String::new();
        content.push_str(GENERATED_HEADER);
        content.push('\n');
        content.push_str(&format!("//\n// {name} ({database}){}\n\n", module_note(module)));
        content.push_str(&body);

        files.push(GeneratedFile {
            file_name: format!("{}_message.rs", snake_case(name)),
            content,
            kind: CodeKind::Extension,
            database: database.to_string(),
        });
    }
    files
}

fn push_message_struct(
    body: &mut String,
    name: &str,
    part: &str,
    config: &MessagePartConfig,
    mapper: &TypeMapper,
) {
    match config.description.as_ref() {
        Some(description) => body.push_str(&format!("/// {description}\n")),
        None => body.push_str(&format!("/// {part} of `{name}`.\n")),
    }
    body.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
    body.push_str(&format!("pub struct {name}{part} {{\n"));
    if let Some(properties) = config.properties.as_ref() {
        for property in properties {
            push_property_field(body, property, mapper);
        }
    }
    body.push_str("}\n");
}
