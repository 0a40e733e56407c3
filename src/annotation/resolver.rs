//! Resolution of parsed annotations into concrete result columns.

use std::collections::HashMap;

use crate::error::SqlGenError;
use crate::schema::{result_column_from, ColumnCatalog, ResultColumnSchema};

use super::{
    find_results_declaration, parse_declaration, parse_select_columns, ResultsDeclaration,
};

/// Result shapes of already-resolved nested procedures, keyed by name.
pub type NestedResults = HashMap<String, Vec<ResultColumnSchema>>;

/// Outcome of resolving one procedure body.
#[derive(Debug, Default)]
pub struct Resolution {
    pub columns: Vec<ResultColumnSchema>,
    /// Protocol violations encountered; callers log these and keep going.
    pub issues: Vec<String>,
}

/// Resolve the `-- Results:` annotation in a procedure body against the
/// column catalog and the map of nested procedure shapes. A body without an
/// annotation resolves to no columns and no issues.
pub fn resolve_result_columns(
    definition: &str,
    catalog: &mut dyn ColumnCatalog,
    nested: &NestedResults,
) -> Result<Resolution, SqlGenError> {
    let mut resolution = Resolution::default();

    let (offset, decl_text) = match find_results_declaration(definition) {
        Some(found) => found,
        None => return Ok(resolution),
    };

    let (declaration, mut parse_issues) = parse_declaration(&decl_text);
    resolution.issues.append(&mut parse_issues);

    match declaration {
        ResultsDeclaration::Procedure(name) => match nested.get(&name) {
            Some(columns) => resolution.columns.extend(columns.iter().cloned()),
            None => resolution
                .issues
                .push(format!("nested procedure '{name}' not found")),
        },
        ResultsDeclaration::Table(name) => match catalog.table_columns(&name)? {
            Some(columns) => resolution
                .columns
                .extend(columns.iter().map(|c| result_column_from(&name, c))),
            None => resolution.issues.push(format!("table '{name}' not found")),
        },
        ResultsDeclaration::Custom(columns) => {
            // Custom columns carry no catalog backing: nullable, no length.
            resolution
                .columns
                .extend(columns.into_iter().map(|c| ResultColumnSchema {
                    column_name: c.name,
                    data_type: c.data_type,
                    is_nullable: true,
                    max_length: None,
                    source_table_name: None,
                }));
        }
        ResultsDeclaration::Joined(mappings) => {
            let alias_map: HashMap<&str, &str> = mappings
                .iter()
                .map(|m| (m.alias.as_str(), m.table.as_str()))
                .collect();
            for select_column in parse_select_columns(&definition[offset..]) {
                let table = match alias_map.get(select_column.table_alias.as_str()) {
                    Some(table) => *table,
                    None => {
                        resolution.issues.push(format!(
                            "table alias '{}' not in results mapping",
                            select_column.table_alias
                        ));
                        continue;
                    }
                };
                match catalog.table_column(table, &select_column.column_name)? {
                    Some(mut column) => {
                        column.column_name = select_column.output_name;
                        resolution.columns.push(column);
                    }
                    None => resolution.issues.push(format!(
                        "column '{}' not found in table '{}'",
                        select_column.column_name, table
                    )),
                }
            }
        }
        ResultsDeclaration::Invalid(text) => {
            if text.is_empty() {
                resolution.issues.push("empty results declaration".to_string());
            } else {
                resolution
                    .issues
                    .push(format!("unrecognized results declaration: {text}"));
            }
        }
    }

    Ok(resolution)
}
