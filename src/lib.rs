//! sqlgen: schema-driven code generation for SQL Server databases
//!
//! This library reads a database schema — from a live catalog connection or
//! from CREATE TABLE scripts — recovers stored-procedure result shapes from
//! `-- Results:` annotations, applies externally authored generation
//! metadata, and writes entity, procedure wrapper, and DTO source files with
//! diff-aware, stale-sweeping output directories.

pub mod annotation;
pub mod codegen;
pub mod config;
pub mod error;
pub mod metadata;
pub mod output;
pub mod schema;
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;

use codegen::dto::{generate_dtos, generate_messages};
use codegen::entity::{generate_entities, EntityGeneration};
use codegen::procedure::generate_procedures;
use codegen::types::TypeMapper;
use codegen::CodeKind;
use config::{DatabaseConfig, Settings};
use metadata::MetadataLoader;
use output::writer::{write_files, OutputLayout};
use schema::live::LiveSchemaReader;
use schema::sql_files::SqlFileSchemaReader;
use schema::SchemaReader;

pub use error::SqlGenError;

/// Options for a generation run
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Path to the sqlgen.yaml settings file
    pub config_path: PathBuf,
    /// Restrict the run to one configured database
    pub database: Option<String>,
    /// Enable verbose output
    pub verbose: bool,
}

/// Aggregate counts over every database processed in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub databases: usize,
    pub generated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub removed: usize,
}

/// Generate code for every configured database (or the one selected via
/// options). Only a missing or unreadable settings file and schema-read
/// failures are fatal; everything downstream logs and continues.
pub fn run_generation(options: GenerateOptions) -> Result<RunReport> {
    let settings = config::load_settings(&options.config_path)?;

    if let Some(only) = options.database.as_ref() {
        if !settings
            .databases
            .keys()
            .any(|name| name.eq_ignore_ascii_case(only))
        {
            tracing::warn!("database '{only}' is not configured in {}", options.config_path.display());
        }
    }

    let mut report = RunReport::default();
    for (name, database) in &settings.databases {
        if let Some(only) = options.database.as_ref() {
            if !only.eq_ignore_ascii_case(name) {
                continue;
            }
        }
        generate_database(name, database, &settings, &mut report, options.verbose)?;
    }
    Ok(report)
}

fn generate_database(
    name: &str,
    database: &DatabaseConfig,
    settings: &Settings,
    report: &mut RunReport,
    verbose: bool,
) -> Result<()> {
    let mut reader: Box<dyn SchemaReader> =
        match (&database.sql_tables_path, &database.connection_string) {
            (Some(path), _) => Box::new(
                SqlFileSchemaReader::new(name, path).with_include(database.include.clone()),
            ),
            (None, Some(connection_string)) => Box::new(LiveSchemaReader::new(connection_string)),
            (None, None) => {
                tracing::warn!(
                    "database '{name}' configures neither sql_tables_path nor connection_string, skipping"
                );
                return Ok(());
            }
        };

    println!(
        "Generating {name} ({})",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let db = reader.read_schema()?;
    let label = if db.database_name.is_empty() {
        name.to_string()
    } else {
        db.database_name.clone()
    };
    if verbose {
        println!(
            "Read schema: {} tables, {} procedures",
            db.tables.len(),
            db.procedures.len()
        );
    }

    let metadata_dir = match database.meta_path.as_ref() {
        Some(path) if path.is_dir() => Some(path.as_path()),
        Some(path) => {
            tracing::warn!("metadata directory not found: {}", path.display());
            None
        }
        None => None,
    };

    let (files, skipped, active) = match metadata_dir {
        // Metadata mode: entities per tables.yaml policy, DTOs and messages
        // per mappings.yaml; procedures are untouched in this mode.
        Some(meta_path) => {
            let loader = MetadataLoader::new(meta_path);
            let tables_metadata = loader.load_tables();
            let mappings = loader.load_mappings();
            let mapper = mappings
                .as_ref()
                .and_then(|m| m.type_mappings.as_ref())
                .map(TypeMapper::with_overrides)
                .unwrap_or_default();

            let entities = match tables_metadata.as_ref() {
                Some(meta) => generate_entities(&label, &db.tables, Some(meta), &mapper),
                None => EntityGeneration::default(),
            };
            let mut files = entities.files;
            if let Some(mappings) = mappings.as_ref() {
                files.extend(generate_dtos(&label, &db.tables, mappings, &mapper));
                files.extend(generate_messages(&label, mappings, &mapper));
            }
            (
                files,
                entities.skipped.len(),
                vec![CodeKind::Table, CodeKind::Extension],
            )
        }
        // Direct mode: every table gets an entity under the default name,
        // every procedure gets a wrapper.
        None => {
            let mapper = TypeMapper::new();
            let entities = generate_entities(&label, &db.tables, None, &mapper);
            let mut files = entities.files;
            files.extend(generate_procedures(&label, &db.procedures, &mapper));
            (
                files,
                entities.skipped.len(),
                vec![CodeKind::Table, CodeKind::StoredProcedure],
            )
        }
    };

    if verbose {
        println!(
            "Prepared {} file(s), {} table(s) skipped by policy",
            files.len(),
            skipped
        );
    }

    let layout = output_layout(&settings.common_path, database);
    let write_report = write_files(&layout, &active, &files);

    report.databases += 1;
    report.generated += write_report.generated.len();
    report.unchanged += write_report.unchanged.len();
    report.skipped += skipped;
    report.failed += write_report.failed.len();
    report.removed += write_report.removed.len();

    print!(
        "{}",
        output::render_summary(&settings.common_path, &write_report, skipped)
    );
    Ok(())
}

fn output_layout(common_path: &Path, database: &DatabaseConfig) -> OutputLayout {
    OutputLayout {
        table_dir: common_path.join(&database.paths.table_path),
        procedure_dir: common_path.join(&database.paths.procedure_path),
        extension_dir: common_path.join(&database.paths.extension_path),
        other_dir: common_path.join(&database.paths.other_path),
    }
}
