//! Normalized database schema model shared by both schema sources.
//!
//! The live catalog reader and the DDL file reader both produce a
//! [`DatabaseSchema`]; everything downstream (annotation resolution, code
//! generation) works from this model and never talks to a source directly.

pub mod live;
pub mod sql_files;

use std::collections::HashMap;

use crate::error::SqlGenError;

/// Complete snapshot of one database: retained tables plus procedures.
#[derive(Debug, Clone, Default)]
pub struct DatabaseSchema {
    pub database_name: String,
    pub tables: Vec<TableSchema>,
    pub procedures: Vec<ProcedureSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub schema: String,
    pub table_name: String,
    /// Columns in ordinal order; generation preserves this order.
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub column_name: String,
    /// Catalog type name, lowercase (`nvarchar`, `int`, ...).
    pub data_type: String,
    /// User-defined type name when the column uses one.
    pub user_defined_type: Option<String>,
    pub is_nullable: bool,
    /// Length for character types; `-1` encodes `MAX`.
    pub character_maximum_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureSchema {
    pub schema: String,
    pub procedure_name: String,
    pub parameters: Vec<ParameterSchema>,
    /// True when the procedure declares the `@RETURN_VALUE` INOUT parameter.
    pub has_out_parameter: bool,
    /// True when the body contains a literal `RETURN <int>`.
    pub has_return: bool,
    /// Result shape recovered from the `-- Results:` annotation.
    pub result_columns: Vec<ResultColumnSchema>,
}

impl ProcedureSchema {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.procedure_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumnSchema {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub max_length: Option<i32>,
    /// Table the column was resolved from, when it came from one.
    pub source_table_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    /// Name as declared, including the `@` sigil.
    pub parameter_name: String,
    pub data_type: String,
    /// User-defined (table) type name for TVP parameters.
    pub defined_type: Option<String>,
    pub parameter_mode: ParameterMode,
    pub character_maximum_length: Option<i32>,
}

/// Name the catalog reports for the implicit return-value slot.
pub const RETURN_VALUE_PARAMETER: &str = "@RETURN_VALUE";

impl ParameterSchema {
    /// True for the catalog's `@RETURN_VALUE` INOUT slot, which is not a
    /// caller-supplied parameter.
    pub fn is_return_value(&self) -> bool {
        self.parameter_mode == ParameterMode::InOut
            && self.parameter_name.eq_ignore_ascii_case(RETURN_VALUE_PARAMETER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

impl ParameterMode {
    /// Parse the catalog's `PARAMETER_MODE` string; unknown values read as IN.
    pub fn from_catalog(mode: &str) -> Self {
        if mode.eq_ignore_ascii_case("INOUT") {
            ParameterMode::InOut
        } else if mode.eq_ignore_ascii_case("OUT") {
            ParameterMode::Out
        } else {
            ParameterMode::In
        }
    }
}

/// A source that can produce a full database schema snapshot.
pub trait SchemaReader {
    fn read_schema(&mut self) -> Result<DatabaseSchema, SqlGenError>;
}

/// Column lookups used while resolving result-set annotations.
///
/// Annotations may reference tables the retention filters dropped, so this is
/// a separate seam from [`DatabaseSchema`]: the live reader answers from the
/// catalog, the file reader from parsed DDL.
pub trait ColumnCatalog {
    /// All columns of a table, or `None` when the table is unknown.
    fn table_columns(
        &mut self,
        table_name: &str,
    ) -> Result<Option<Vec<ColumnSchema>>, SqlGenError>;

    /// A single column of a table as a result column, or `None` when unknown.
    fn table_column(
        &mut self,
        table_name: &str,
        column_name: &str,
    ) -> Result<Option<ResultColumnSchema>, SqlGenError> {
        let columns = match self.table_columns(table_name)? {
            Some(columns) => columns,
            None => return Ok(None),
        };
        Ok(columns
            .iter()
            .find(|c| c.column_name.eq_ignore_ascii_case(column_name))
            .map(|c| result_column_from(table_name, c)))
    }
}

/// Project a table column into a result column tagged with its source table.
pub fn result_column_from(table_name: &str, column: &ColumnSchema) -> ResultColumnSchema {
    ResultColumnSchema {
        column_name: column.column_name.clone(),
        data_type: column.data_type.clone(),
        is_nullable: column.is_nullable,
        max_length: column.character_maximum_length,
        source_table_name: Some(table_name.to_string()),
    }
}

/// In-memory [`ColumnCatalog`] over already-materialized tables.
#[derive(Debug, Default)]
pub struct TableIndex {
    tables: HashMap<String, TableSchema>,
}

impl TableIndex {
    pub fn new(tables: &[TableSchema]) -> Self {
        let mut index = TableIndex::default();
        for table in tables {
            index.insert(table.clone());
        }
        index
    }

    pub fn insert(&mut self, table: TableSchema) {
        self.tables
            .insert(table.table_name.to_ascii_lowercase(), table);
    }
}

impl ColumnCatalog for TableIndex {
    fn table_columns(
        &mut self,
        table_name: &str,
    ) -> Result<Option<Vec<ColumnSchema>>, SqlGenError> {
        Ok(self
            .tables
            .get(&table_name.to_ascii_lowercase())
            .map(|t| t.columns.clone()))
    }
}

/// Tables excluded by name regardless of schema.
const TABLE_DENYLIST: &[&str] = &["sysdiagrams"];

/// Schema whose procedures are only reachable through `Procedure:` annotations.
pub const NESTED_SCHEMA: &str = "nested";

/// Table retention rule shared by both schema sources: no underscore in the
/// name, nothing in the nested schema, nothing on the denylist.
pub fn is_table_included(schema: &str, table_name: &str) -> bool {
    !table_name.contains('_')
        && !schema.eq_ignore_ascii_case(NESTED_SCHEMA)
        && !TABLE_DENYLIST
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table_name))
}

/// Procedure retention rule: underscore names are excluded.
pub fn is_procedure_included(procedure_name: &str) -> bool {
    !procedure_name.contains('_')
}
