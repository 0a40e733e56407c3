//! Unit tests for procedure result annotations
//!
//! These tests drive the annotation scanner and resolver through full
//! procedure bodies, the way the schema readers hand them over.

use sqlgen::annotation::resolver::{resolve_result_columns, NestedResults};
use sqlgen::annotation::{
    find_results_declaration, has_return_statement, parse_declaration, ResultsDeclaration,
};
use sqlgen::schema::{ColumnSchema, ResultColumnSchema, TableIndex, TableSchema};

/// Helper to build a column with the fields these tests care about
fn column(name: &str, data_type: &str, nullable: bool, length: Option<i32>) -> ColumnSchema {
    ColumnSchema {
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        user_defined_type: None,
        is_nullable: nullable,
        character_maximum_length: length,
        numeric_precision: None,
        numeric_scale: None,
    }
}

fn table(name: &str, columns: Vec<ColumnSchema>) -> TableSchema {
    TableSchema {
        schema: "dbo".to_string(),
        table_name: name.to_string(),
        columns,
    }
}

/// Catalog with two related tables, enough for every join scenario below
fn catalog() -> TableIndex {
    TableIndex::new(&[
        table(
            "Players",
            vec![
                column("Id", "bigint", false, None),
                column("Name", "nvarchar", false, Some(50)),
                column("Ranking", "int", true, None),
            ],
        ),
        table(
            "Matches",
            vec![
                column("Id", "bigint", false, None),
                column("HomeScore", "int", true, None),
                column("PlayedOn", "datetime2", false, None),
            ],
        ),
    ])
}

// ============================================================================
// Annotation Discovery Tests
// ============================================================================

#[test]
fn test_finds_declaration_in_full_procedure_body() {
    let body = r#"CREATE PROCEDURE [dbo].[GetPlayer]
    @PlayerId BIGINT
AS
BEGIN
    SET NOCOUNT ON;

    -- Results: Table:Players
    SELECT [Id], [Name], [Ranking]
    FROM [dbo].[Players]
    WHERE [Id] = @PlayerId;

    RETURN 0;
END"#;

    let (_, decl) = find_results_declaration(body).expect("Should find the annotation");
    assert_eq!(decl, "Table:Players");

    let (parsed, issues) = parse_declaration(&decl);
    assert_eq!(parsed, ResultsDeclaration::Table("Players".to_string()));
    assert!(issues.is_empty(), "Unexpected issues: {:?}", issues);
}

#[test]
fn test_first_declaration_wins() {
    let body = "-- Results: Custom:Code:INT\nSELECT 1\n-- Results: Table:Players\nSELECT 2";

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert_eq!(resolution.columns.len(), 1, "Should use the first annotation");
    assert_eq!(resolution.columns[0].column_name, "Code");
}

#[test]
fn test_body_without_annotation_resolves_to_nothing() {
    let body = "CREATE PROCEDURE [dbo].[Cleanup] AS BEGIN DELETE FROM [dbo].[Matches] END";

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert!(resolution.columns.is_empty());
    assert!(resolution.issues.is_empty());
}

// ============================================================================
// Table Form Tests
// ============================================================================

#[test]
fn test_table_annotation_preserves_column_order_and_source() {
    let body = "-- Results: Table:Players\nSELECT * FROM [dbo].[Players]";

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    let names: Vec<&str> = resolution
        .columns
        .iter()
        .map(|c| c.column_name.as_str())
        .collect();
    assert_eq!(names, vec!["Id", "Name", "Ranking"], "Ordinal order must hold");

    for col in &resolution.columns {
        assert_eq!(col.source_table_name.as_deref(), Some("Players"));
    }
    assert_eq!(resolution.columns[1].max_length, Some(50));
    assert!(resolution.columns[2].is_nullable, "Ranking is declared NULL");
    assert!(!resolution.columns[0].is_nullable, "Id is declared NOT NULL");
}

#[test]
fn test_table_lookup_is_case_insensitive() {
    let body = "-- results: table:PLAYERS\nSELECT * FROM [dbo].[Players]";

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert_eq!(resolution.columns.len(), 3);
    assert!(resolution.issues.is_empty(), "Unexpected issues: {:?}", resolution.issues);
}

#[test]
fn test_unknown_table_reports_issue_and_yields_no_columns() {
    let body = "-- Results: Table:Referees\nSELECT * FROM [dbo].[Referees]";

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert!(resolution.columns.is_empty());
    assert_eq!(resolution.issues.len(), 1, "Expected one issue: {:?}", resolution.issues);
    assert!(
        resolution.issues[0].contains("Referees"),
        "Issue should name the missing table: {}",
        resolution.issues[0]
    );
}

// ============================================================================
// Custom Form Tests
// ============================================================================

#[test]
fn test_custom_columns_are_always_nullable_without_length() {
    let body = "-- Results: Custom: Total : INT , Label : NVARCHAR\nSELECT COUNT(*), 'x'";

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert_eq!(resolution.columns.len(), 2);
    for col in &resolution.columns {
        assert!(col.is_nullable, "Custom columns carry no nullability info");
        assert_eq!(col.max_length, None);
        assert_eq!(col.source_table_name, None);
    }
    assert_eq!(resolution.columns[0].column_name, "Total");
    assert_eq!(resolution.columns[0].data_type, "INT");
    assert_eq!(resolution.columns[1].column_name, "Label");
}

// ============================================================================
// Procedure Form Tests
// ============================================================================

#[test]
fn test_procedure_annotation_copies_nested_shape() {
    let shape = vec![ResultColumnSchema {
        column_name: "PlayerName".to_string(),
        data_type: "nvarchar".to_string(),
        is_nullable: false,
        max_length: Some(50),
        source_table_name: Some("Players".to_string()),
    }];
    let mut nested = NestedResults::new();
    nested.insert("NspTopPlayers".to_string(), shape.clone());

    let body = "-- Results: Procedure:NspTopPlayers\nEXEC [nested].[NspTopPlayers]";

    let mut index = catalog();
    let resolution =
        resolve_result_columns(body, &mut index, &nested).expect("Resolution should succeed");

    assert_eq!(resolution.columns, shape, "Nested shape should be copied as-is");
    assert!(resolution.issues.is_empty());
}

#[test]
fn test_procedure_annotation_missing_nested_is_an_issue() {
    let body = "-- Results: Procedure:NspMissing\nEXEC [nested].[NspMissing]";

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert!(resolution.columns.is_empty());
    assert_eq!(resolution.issues.len(), 1);
    assert!(
        resolution.issues[0].contains("NspMissing"),
        "Issue should name the missing procedure: {}",
        resolution.issues[0]
    );
}

// ============================================================================
// Joined Form Tests
// ============================================================================

#[test]
fn test_joined_annotation_resolves_aliases_and_renames() {
    let body = r#"CREATE PROCEDURE [dbo].[GetPlayerReport]
AS
BEGIN
    -- Results: Players p, Matches m
    SELECT p.[Id], p.[Name], m.[HomeScore] AS [Score]
    FROM [dbo].[Players] p
    JOIN [dbo].[Matches] m ON m.[Id] = p.[Id];
END"#;

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert!(resolution.issues.is_empty(), "Unexpected issues: {:?}", resolution.issues);
    assert_eq!(resolution.columns.len(), 3);

    assert_eq!(resolution.columns[0].column_name, "Id");
    assert_eq!(resolution.columns[0].source_table_name.as_deref(), Some("Players"));
    assert_eq!(resolution.columns[0].data_type, "bigint");

    // The AS alias becomes the output name but the type comes from HomeScore.
    assert_eq!(resolution.columns[2].column_name, "Score");
    assert_eq!(resolution.columns[2].source_table_name.as_deref(), Some("Matches"));
    assert_eq!(resolution.columns[2].data_type, "int");
    assert!(resolution.columns[2].is_nullable);
}

#[test]
fn test_joined_annotation_scans_select_after_the_annotation() {
    // The guard clause contains an earlier SELECT; the annotated SELECT is
    // the one the declaration must be matched against.
    let body = r#"CREATE PROCEDURE [dbo].[GetRankedPlayers]
AS
BEGIN
    IF NOT EXISTS (SELECT 1 FROM [dbo].[Players])
    BEGIN
        RETURN 1;
    END

    -- Results: Players p, Matches m
    SELECT p.[Id], p.[Ranking]
    FROM [dbo].[Players] p
    WHERE p.[Ranking] IS NOT NULL;

    RETURN 0;
END"#;

    let mut index = catalog();
    let resolution = resolve_result_columns(body, &mut index, &NestedResults::new())
        .expect("Resolution should succeed");

    assert!(resolution.issues.is_empty(), "Unexpected issues: {:?}", resolution.issues);
    let names: Vec<&str> = resolution
        .columns
        .iter()
        .map(|c| c.column_name.as_str())
        .collect();
    assert_eq!(names, vec!["Id", "Ranking"]);
}

// ============================================================================
// Return Statement Tests
// ============================================================================

#[test]
fn test_return_detection_in_full_bodies() {
    let with_return = "CREATE PROCEDURE P AS BEGIN\n  SELECT 1;\n  RETURN 0;\nEND";
    let negative_return = "CREATE PROCEDURE P AS BEGIN RETURN -1 END";
    let variable_return = "CREATE PROCEDURE P AS BEGIN RETURN @Result END";
    let no_return = "CREATE PROCEDURE P AS BEGIN SELECT 1 END";

    assert!(has_return_statement(with_return));
    assert!(has_return_statement(negative_return));
    assert!(!has_return_statement(variable_return), "Only literal codes count");
    assert!(!has_return_statement(no_return));
}
