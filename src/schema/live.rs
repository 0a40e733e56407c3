//! Live SQL Server catalog reader.
//!
//! Connects with tiberius over a tokio TCP stream and walks the
//! `INFORMATION_SCHEMA` views. The [`SchemaReader`] contract is synchronous;
//! a current-thread runtime lives only for the duration of one read.
//!
//! All column metadata is fetched in a single catalog-wide query and held in
//! a [`TableIndex`], which both feeds the retained table list and answers
//! annotation lookups, including tables the retention filters dropped.

use std::collections::{HashMap, HashSet};

use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{
    is_procedure_included, is_table_included, ColumnSchema, DatabaseSchema, ParameterMode,
    ParameterSchema, ProcedureSchema, SchemaReader, TableIndex, TableSchema, NESTED_SCHEMA,
};
use crate::annotation::resolver::{resolve_result_columns, NestedResults};
use crate::annotation::has_return_statement;
use crate::error::SqlGenError;

type SqlClient = Client<Compat<TcpStream>>;

const DATABASE_NAME_QUERY: &str = "SELECT DB_NAME()";

const TABLES_QUERY: &str = "\
SELECT TABLE_NAME, TABLE_SCHEMA \
FROM INFORMATION_SCHEMA.TABLES \
WHERE TABLE_TYPE = 'BASE TABLE' \
ORDER BY TABLE_NAME";

// Sorted by table then ordinal so rows group into per-table column lists.
// The sys.types join recovers user-defined type names the same way the
// catalog reports them for columns.
const COLUMNS_QUERY: &str = "\
SELECT c.TABLE_NAME, c.COLUMN_NAME, c.DATA_TYPE, c.IS_NULLABLE, \
c.CHARACTER_MAXIMUM_LENGTH, CAST(c.NUMERIC_PRECISION AS INT) AS NUMERIC_PRECISION, \
CAST(c.NUMERIC_SCALE AS INT) AS NUMERIC_SCALE, t.name AS USER_DEFINED_TYPE_NAME \
FROM INFORMATION_SCHEMA.COLUMNS c \
LEFT JOIN sys.types t ON c.DATA_TYPE = t.name \
ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION";

const PROCEDURES_QUERY: &str = "\
SELECT ROUTINE_SCHEMA, ROUTINE_NAME \
FROM INFORMATION_SCHEMA.ROUTINES \
WHERE ROUTINE_TYPE = 'PROCEDURE' \
ORDER BY ROUTINE_NAME";

const PARAMETERS_QUERY: &str = "\
SELECT p.PARAMETER_NAME, p.DATA_TYPE, p.PARAMETER_MODE, p.CHARACTER_MAXIMUM_LENGTH, \
t.name AS USER_DEFINED_TYPE_NAME \
FROM INFORMATION_SCHEMA.PARAMETERS p \
LEFT JOIN sys.types t ON p.DATA_TYPE = t.name \
WHERE p.SPECIFIC_NAME = @P1 AND p.SPECIFIC_SCHEMA = @P2 AND p.PARAMETER_NAME IS NOT NULL \
ORDER BY p.ORDINAL_POSITION";

const DEFINITION_QUERY: &str = "SELECT OBJECT_DEFINITION(OBJECT_ID(@P1))";

/// Reads a schema from a live server, addressed by an ADO connection string.
pub struct LiveSchemaReader {
    connection_string: String,
}

impl LiveSchemaReader {
    pub fn new(connection_string: impl Into<String>) -> Self {
        LiveSchemaReader {
            connection_string: connection_string.into(),
        }
    }
}

impl SchemaReader for LiveSchemaReader {
    fn read_schema(&mut self) -> Result<DatabaseSchema, SqlGenError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SqlGenError::ConnectionError {
                message: e.to_string(),
            })?;

        runtime.block_on(async {
            let mut session = CatalogSession::connect(&self.connection_string).await?;
            session.read_schema().await
        })
    }
}

fn catalog_err(operation: &str, err: tiberius::error::Error) -> SqlGenError {
    SqlGenError::CatalogQueryError {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

/// One open connection plus the column index built from it.
struct CatalogSession {
    client: SqlClient,
}

impl CatalogSession {
    async fn connect(connection_string: &str) -> Result<CatalogSession, SqlGenError> {
        let config = Config::from_ado_string(connection_string)?;
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| SqlGenError::ConnectionError {
                message: e.to_string(),
            })?;
        tcp.set_nodelay(true)
            .map_err(|e| SqlGenError::ConnectionError {
                message: e.to_string(),
            })?;
        let client = Client::connect(config, tcp.compat_write()).await?;
        Ok(CatalogSession { client })
    }

    /// Read the full schema. Connection failures are fatal; each catalog
    /// scope afterwards degrades to empty on error so a partial schema still
    /// generates.
    async fn read_schema(&mut self) -> Result<DatabaseSchema, SqlGenError> {
        let database_name = self.database_name().await?;

        let table_rows = self.table_rows().await.unwrap_or_else(|err| {
            tracing::error!("{err}");
            Vec::new()
        });
        let catalog_tables = self.catalog_tables(&table_rows).await.unwrap_or_else(|err| {
            tracing::error!("{err}");
            Vec::new()
        });

        // Base tables only, already name-sorted by the catalog query.
        let base_tables: HashSet<&str> =
            table_rows.iter().map(|(name, _)| name.as_str()).collect();
        let tables: Vec<TableSchema> = catalog_tables
            .iter()
            .filter(|t| {
                base_tables.contains(t.table_name.as_str())
                    && is_table_included(&t.schema, &t.table_name)
            })
            .cloned()
            .collect();

        let mut index = TableIndex::new(&catalog_tables);
        let procedures = self.read_procedures(&mut index).await;

        Ok(DatabaseSchema {
            database_name,
            tables,
            procedures,
        })
    }

    async fn database_name(&mut self) -> Result<String, SqlGenError> {
        let row = self
            .client
            .simple_query(DATABASE_NAME_QUERY)
            .await
            .map_err(|e| catalog_err("database name", e))?
            .into_row()
            .await
            .map_err(|e| catalog_err("database name", e))?;
        Ok(row
            .and_then(|r| r.get::<&str, _>(0).map(|s| s.to_string()))
            .unwrap_or_default())
    }

    /// `(table_name, schema)` pairs for every base table, unfiltered.
    async fn table_rows(&mut self) -> Result<Vec<(String, String)>, SqlGenError> {
        let rows = self
            .client
            .simple_query(TABLES_QUERY)
            .await
            .map_err(|e| catalog_err("tables", e))?
            .into_first_result()
            .await
            .map_err(|e| catalog_err("tables", e))?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<&str, _>(0).unwrap_or_default().to_string(),
                    row.get::<&str, _>(1).unwrap_or_default().to_string(),
                )
            })
            .collect())
    }

    /// Every table the column catalog knows, with columns in ordinal order.
    async fn catalog_tables(
        &mut self,
        table_rows: &[(String, String)],
    ) -> Result<Vec<TableSchema>, SqlGenError> {
        let schemas: HashMap<&str, &str> = table_rows
            .iter()
            .map(|(name, schema)| (name.as_str(), schema.as_str()))
            .collect();

        let rows = self
            .client
            .simple_query(COLUMNS_QUERY)
            .await
            .map_err(|e| catalog_err("columns", e))?
            .into_first_result()
            .await
            .map_err(|e| catalog_err("columns", e))?;

        let mut tables: Vec<TableSchema> = Vec::new();
        for row in &rows {
            let table_name = row.get::<&str, _>(0).unwrap_or_default().to_string();
            let column = ColumnSchema {
                column_name: row.get::<&str, _>(1).unwrap_or_default().to_string(),
                data_type: row.get::<&str, _>(2).unwrap_or_default().to_string(),
                is_nullable: row
                    .get::<&str, _>(3)
                    .map(|v| v.eq_ignore_ascii_case("YES"))
                    .unwrap_or(false),
                character_maximum_length: row.get::<i32, _>(4),
                numeric_precision: row.get::<i32, _>(5),
                numeric_scale: row.get::<i32, _>(6),
                user_defined_type: row.get::<&str, _>(7).map(|s| s.to_string()),
            };

            let start_new = tables
                .last()
                .map(|t: &TableSchema| t.table_name != table_name)
                .unwrap_or(true);
            if start_new {
                let schema = schemas
                    .get(table_name.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "dbo".to_string());
                tables.push(TableSchema {
                    schema,
                    table_name: table_name.clone(),
                    columns: Vec::new(),
                });
            }
            if let Some(table) = tables.last_mut() {
                table.columns.push(column);
            }
        }
        Ok(tables)
    }

    /// Nested-schema procedures resolve first so their result shapes are
    /// available to `Procedure:` annotations in the main pass.
    async fn read_procedures(&mut self, index: &mut TableIndex) -> Vec<ProcedureSchema> {
        let names = match self.procedure_rows().await {
            Ok(names) => names,
            Err(err) => {
                tracing::error!("{err}");
                return Vec::new();
            }
        };

        let mut nested = NestedResults::new();
        for (schema, name) in &names {
            if !is_procedure_included(name) || !schema.eq_ignore_ascii_case(NESTED_SCHEMA) {
                continue;
            }
            let procedure = self
                .read_procedure(schema, name, index, &NestedResults::new())
                .await;
            nested.insert(name.clone(), procedure.result_columns);
        }

        let mut procedures = Vec::new();
        for (schema, name) in &names {
            if !is_procedure_included(name) || schema.eq_ignore_ascii_case(NESTED_SCHEMA) {
                continue;
            }
            procedures.push(self.read_procedure(schema, name, index, &nested).await);
        }
        procedures
    }

    /// `(schema, name)` pairs for every procedure, unfiltered.
    async fn procedure_rows(&mut self) -> Result<Vec<(String, String)>, SqlGenError> {
        let rows = self
            .client
            .simple_query(PROCEDURES_QUERY)
            .await
            .map_err(|e| catalog_err("procedures", e))?
            .into_first_result()
            .await
            .map_err(|e| catalog_err("procedures", e))?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<&str, _>(0).unwrap_or_default().to_string(),
                    row.get::<&str, _>(1).unwrap_or_default().to_string(),
                )
            })
            .collect())
    }

    async fn read_procedure(
        &mut self,
        schema: &str,
        name: &str,
        index: &mut TableIndex,
        nested: &NestedResults,
    ) -> ProcedureSchema {
        let parameters = match self.parameter_rows(schema, name).await {
            Ok(parameters) => parameters,
            Err(err) => {
                tracing::error!("{err}");
                Vec::new()
            }
        };
        let has_out_parameter = parameters.iter().any(|p| p.is_return_value());

        let definition = match self.procedure_definition(schema, name).await {
            Ok(definition) => definition,
            Err(err) => {
                tracing::error!("{err}");
                None
            }
        };

        let mut has_return = false;
        let mut result_columns = Vec::new();
        if let Some(definition) = &definition {
            has_return = has_return_statement(definition);
            match resolve_result_columns(definition, index, nested) {
                Ok(resolution) => {
                    for issue in &resolution.issues {
                        tracing::error!("{schema}.{name}: {issue}");
                    }
                    result_columns = resolution.columns;
                }
                Err(err) => tracing::error!("{schema}.{name}: {err}"),
            }
        }

        ProcedureSchema {
            schema: schema.to_string(),
            procedure_name: name.to_string(),
            parameters,
            has_out_parameter,
            has_return,
            result_columns,
        }
    }

    async fn parameter_rows(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<Vec<ParameterSchema>, SqlGenError> {
        let rows = self
            .client
            .query(PARAMETERS_QUERY, &[&name, &schema])
            .await
            .map_err(|e| catalog_err("parameters", e))?
            .into_first_result()
            .await
            .map_err(|e| catalog_err("parameters", e))?;

        Ok(rows
            .iter()
            .map(|row| ParameterSchema {
                parameter_name: row.get::<&str, _>(0).unwrap_or_default().to_string(),
                data_type: row.get::<&str, _>(1).unwrap_or_default().to_string(),
                parameter_mode: ParameterMode::from_catalog(
                    row.get::<&str, _>(2).unwrap_or_default(),
                ),
                character_maximum_length: row.get::<i32, _>(3),
                defined_type: row.get::<&str, _>(4).map(|s| s.to_string()),
            })
            .collect())
    }

    async fn procedure_definition(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<Option<String>, SqlGenError> {
        let qualified = format!("{schema}.{name}");
        let row = self
            .client
            .query(DEFINITION_QUERY, &[&qualified])
            .await
            .map_err(|e| catalog_err("procedure definition", e))?
            .into_row()
            .await
            .map_err(|e| catalog_err("procedure definition", e))?;

        Ok(row.and_then(|r| r.get::<&str, _>(0).map(|s| s.to_string())))
    }
}
