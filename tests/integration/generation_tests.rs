//! Integration tests for the direct generation workflow
//!
//! Direct mode reads DDL files and generates one entity per retained table,
//! with no metadata involved. These tests run the whole pipeline through
//! `run_generation` against real temp directories.

use std::path::PathBuf;

use sqlgen::{GenerateOptions, RunReport, SqlGenError};

use crate::common::{list_files, read_generated, OutputInfo, TestContext};
use crate::{assert_output_contains, assert_output_not_contains};

const LEAGUE_DDL: &str =
    "CREATE TABLE [dbo].[League] ([Id] INT NOT NULL, [Name] NVARCHAR(100) NOT NULL)";
const TEAM_DDL: &str =
    "CREATE TABLE [dbo].[Team] ([Id] INT NOT NULL, [LeagueId] INT NOT NULL, [Name] NVARCHAR(100) NOT NULL)";

// ============================================================================
// Basic Generation Tests
// ============================================================================

#[test]
fn test_static_run_generates_entities_per_table() {
    let ctx = TestContext::new("gamedb");
    ctx.add_sql("League.sql", LEAGUE_DDL);
    ctx.add_sql("Team.sql", TEAM_DDL);

    let report = ctx.generate_successfully(false);
    assert_eq!(report.databases, 1);
    assert_eq!(report.generated, 2);
    assert_eq!(report.unchanged, 0);
    assert_eq!(report.skipped, 0);

    let info = OutputInfo::from_output(&ctx);
    assert_eq!(info.tables, ["league_entity.rs", "team_entity.rs"]);

    let content = read_generated(&ctx.table_dir(), "league_entity.rs");
    assert!(content.contains("pub struct LeagueEntity {"));
    assert!(content.contains("    pub id: i32,"));
    assert!(content.contains("    pub name: String,"));
    assert!(content.contains("pub const TABLE: &'static str = \"dbo.League\";"));
}

#[test]
fn test_second_run_is_idempotent() {
    let ctx = TestContext::new("gamedb");
    ctx.add_sql("League.sql", LEAGUE_DDL);
    ctx.add_sql("Team.sql", TEAM_DDL);

    let first = ctx.generate_successfully(false);
    assert_eq!(first.generated, 2);

    let second = ctx.generate_successfully(false);
    assert_eq!(second.generated, 0, "Nothing changed, nothing rewritten");
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.removed, 0);
}

#[test]
fn test_edited_schema_rewrites_only_changed_files() {
    let ctx = TestContext::new("gamedb");
    ctx.add_sql("League.sql", LEAGUE_DDL);
    ctx.add_sql("Team.sql", TEAM_DDL);
    ctx.generate_successfully(false);

    ctx.add_sql(
        "Team.sql",
        "CREATE TABLE [dbo].[Team] (\n\
         \x20   [Id] INT NOT NULL,\n\
         \x20   [LeagueId] INT NOT NULL,\n\
         \x20   [Name] NVARCHAR(100) NOT NULL,\n\
         \x20   [City] NVARCHAR(50) NULL\n\
         )",
    );

    let report = ctx.generate_successfully(false);
    assert_eq!(report.generated, 1, "Only the edited table is rewritten");
    assert_eq!(report.unchanged, 1);

    let content = read_generated(&ctx.table_dir(), "team_entity.rs");
    assert!(content.contains("    pub city: Option<String>,"));
}

// ============================================================================
// Reconciliation Tests
// ============================================================================

#[test]
fn test_removed_table_sweeps_stale_output() {
    let ctx = TestContext::new("gamedb");
    ctx.add_sql("League.sql", LEAGUE_DDL);
    ctx.add_sql("Team.sql", TEAM_DDL);
    ctx.generate_successfully(false);

    ctx.remove_sql("Team.sql");
    let report = ctx.generate_successfully(false);
    assert_eq!(report.removed, 1);
    assert_eq!(report.unchanged, 1);

    let info = OutputInfo::from_output(&ctx);
    assert_output_contains!(info.tables, "league_entity.rs");
    assert_output_not_contains!(info.tables, "team_entity.rs");
}

#[test]
fn test_retention_filters_exclude_tables() {
    let ctx = TestContext::new("gamedb");
    ctx.add_sql("Team.sql", TEAM_DDL);
    ctx.add_sql(
        "Team_Audit.sql",
        "CREATE TABLE [dbo].[Team_Audit] ([Id] INT NOT NULL)",
    );
    ctx.add_sql(
        "Lookup.sql",
        "CREATE TABLE [nested].[Lookup] ([Code] INT NOT NULL)",
    );
    ctx.add_sql(
        "sysdiagrams.sql",
        "CREATE TABLE [dbo].[sysdiagrams] ([Id] INT NOT NULL)",
    );

    let report = ctx.generate_successfully(false);
    assert_eq!(report.generated, 1);

    let info = OutputInfo::from_output(&ctx);
    assert_eq!(info.tables, ["team_entity.rs"]);
    assert!(
        !ctx.procedure_dir().exists(),
        "No procedures in static mode, so the directory never appears"
    );
}

// ============================================================================
// Settings Handling Tests
// ============================================================================

#[test]
fn test_database_without_source_is_skipped() {
    let ctx = TestContext::new("emptydb");
    let config_path = ctx.write_settings_yaml(&format!(
        "common_path: \"{}\"\ndatabases:\n  emptydb: {{}}\n",
        ctx.out_dir().display()
    ));

    let report = sqlgen::run_generation(GenerateOptions {
        config_path,
        database: None,
        verbose: false,
    })
    .expect("A source-less entry skips, it does not fail");

    assert_eq!(report, RunReport::default());
    assert!(!ctx.out_dir().exists());
}

#[test]
fn test_database_filter_selects_one_entry() {
    let ctx = TestContext::new("alpha");
    ctx.add_sql("Team.sql", TEAM_DDL);
    let tables_path = ctx.root.join("Tables");
    let config_path = ctx.write_settings_yaml(&format!(
        "common_path: \"{out}\"\n\
         databases:\n\
         \x20 alpha:\n\
         \x20   sql_tables_path: \"{tables}\"\n\
         \x20   paths:\n\
         \x20     table_path: alpha_tables\n\
         \x20 beta:\n\
         \x20   sql_tables_path: \"{tables}\"\n\
         \x20   paths:\n\
         \x20     table_path: beta_tables\n",
        out = ctx.out_dir().display(),
        tables = tables_path.display()
    ));

    // Filter comparison ignores case.
    let report = sqlgen::run_generation(GenerateOptions {
        config_path,
        database: Some("BETA".to_string()),
        verbose: false,
    })
    .expect("Filtered run should succeed");

    assert_eq!(report.databases, 1);
    assert_eq!(
        list_files(&ctx.out_dir().join("beta_tables")),
        ["team_entity.rs"]
    );
    assert!(!ctx.out_dir().join("alpha_tables").exists());
}

#[test]
fn test_missing_config_is_fatal() {
    let result = sqlgen::run_generation(GenerateOptions {
        config_path: PathBuf::from("/nonexistent/sqlgen.yaml"),
        database: None,
        verbose: false,
    });

    let err = result.expect_err("A missing settings file must fail the run");
    assert!(
        matches!(
            err.downcast_ref::<SqlGenError>(),
            Some(SqlGenError::ConfigMissing { .. })
        ),
        "Unexpected error: {err:?}"
    );
}
