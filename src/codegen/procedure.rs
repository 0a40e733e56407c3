//! Procedure wrapper generation.
//!
//! Each stored procedure becomes one file holding a params struct with the
//! call constants and, when the procedure declares a result shape, a row
//! struct mirroring its columns. Generated content is dependency-free so any
//! data layer can drive the call.

use crate::schema::{ParameterMode, ParameterSchema, ProcedureSchema};
use crate::util::snake_case;

use super::types::TypeMapper;
use super::{field_ident, sql_type_display, CodeKind, GeneratedFile, GENERATED_HEADER};

pub fn generate_procedures(
    database: &str,
    procedures: &[ProcedureSchema],
    mapper: &TypeMapper,
) -> Vec<GeneratedFile> {
    procedures
        .iter()
        .map(|procedure| procedure_file(database, procedure, mapper))
        .collect()
}

fn procedure_file(
    database: &str,
    procedure: &ProcedureSchema,
    mapper: &TypeMapper,
) -> GeneratedFile {
    let qualified = procedure.qualified_name();
    let callable: Vec<&ParameterSchema> = procedure
        .parameters
        .iter()
        .filter(|p| !p.is_return_value())
        .collect();

    let mut content = String::new();
    content.push_str(GENERATED_HEADER);
    content.push('\n');
    content.push_str(&format!("//\n// {qualified} ({database})\n\n"));

    content.push_str(&format!("/// Call surface for `{qualified}`.\n"));
    content.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
    content.push_str(&format!(
        "pub struct {}Params {{\n",
        procedure.procedure_name
    ));
    for parameter in &callable {
        content.push_str(&format!(
            "    /// `{}` {}{}\n",
            parameter.parameter_name,
            parameter_type_display(parameter),
            match parameter.parameter_mode {
                ParameterMode::In => "",
                ParameterMode::Out | ParameterMode::InOut => ", OUTPUT",
            },
        ));
        content.push_str(&format!(
            "    pub {}: {},\n",
            parameter_field(parameter),
            parameter_rust_type(parameter, mapper),
        ));
    }
    content.push_str("}\n\n");

    content.push_str(&format!("impl {}Params {{\n", procedure.procedure_name));
    content.push_str(&format!(
        "    pub const PROCEDURE: &'static str = \"{qualified}\";\n"
    ));
    content.push_str(&format!(
        "    pub const HAS_RETURN_VALUE: bool = {};\n",
        procedure.has_return
    ));
    content.push_str(&format!(
        "    pub const HAS_OUT_PARAMETER: bool = {};\n",
        procedure.has_out_parameter
    ));
    content.push_str(&format!(
        "    /// Positional placeholder form for driver-level execution.\n    pub const EXEC_SQL: &'static str = \"{}\";\n",
        exec_sql(&qualified, &callable),
    ));
    content.push_str("}\n");

    if !procedure.result_columns.is_empty() {
        content.push('\n');
        content.push_str(&format!(
            "/// One row of the `{qualified}` result set.\n"
        ));
        content.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
        content.push_str(&format!(
            "pub struct {}Row {{\n",
            procedure.procedure_name
        ));
        for column in &procedure.result_columns {
            let source = column
                .source_table_name
                .as_ref()
                .map(|table| format!(", from `{table}`"))
                .unwrap_or_default();
            content.push_str(&format!(
                "    /// `{}` {}, {}{}\n",
                column.column_name,
                sql_type_display(&column.data_type, column.max_length, None, None),
                if column.is_nullable { "null" } else { "not null" },
                source,
            ));
            content.push_str(&format!(
                "    pub {}: {},\n",
                field_ident(&column.column_name),
                mapper.rust_type(&column.data_type, column.is_nullable),
            ));
        }
        content.push_str("}\n");
    }

    GeneratedFile {
        file_name: format!("{}.rs", snake_case(&procedure.procedure_name)),
        content,
        kind: CodeKind::StoredProcedure,
        database: database.to_string(),
    }
}

fn is_table_valued(parameter: &ParameterSchema) -> bool {
    parameter.data_type.eq_ignore_ascii_case("table type")
}

fn parameter_field(parameter: &ParameterSchema) -> String {
    field_ident(parameter.parameter_name.trim_start_matches('@'))
}

fn parameter_rust_type(parameter: &ParameterSchema, mapper: &TypeMapper) -> String {
    if is_table_valued(parameter) {
        // No row struct exists for table types; rows travel pre-rendered.
        "Vec<String>".to_string()
    } else {
        mapper.rust_type(&parameter.data_type, false)
    }
}

fn parameter_type_display(parameter: &ParameterSchema) -> String {
    if is_table_valued(parameter) {
        match &parameter.defined_type {
            Some(defined) => format!("{defined} (table-valued)"),
            None => "table type".to_string(),
        }
    } else {
        sql_type_display(
            &parameter.data_type,
            parameter.character_maximum_length,
            None,
            None,
        )
    }
}

fn exec_sql(qualified: &str, parameters: &[&ParameterSchema]) -> String {
    let mut sql = format!("EXEC {qualified}");
    for (position, parameter) in parameters.iter().enumerate() {
        if position > 0 {
            sql.push(',');
        }
        sql.push_str(&format!(
            " {} = @P{}",
            parameter.parameter_name,
            position + 1
        ));
    }
    sql
}
