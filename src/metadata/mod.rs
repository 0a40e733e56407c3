//! Externally authored generation metadata.
//!
//! Two YAML documents steer generation: `tables.yaml` decides which tables
//! get entities and under which names, `mappings.yaml` describes composed
//! DTOs and messages. Keys are PascalCase; unknown keys are ignored so the
//! documents can carry annotations for other tools.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::SqlGenError;

/// Loads metadata documents from one directory, best-effort: a missing or
/// unparseable file logs and reads as absent instead of failing the run.
pub struct MetadataLoader {
    meta_path: PathBuf,
}

impl MetadataLoader {
    pub fn new(meta_path: impl Into<PathBuf>) -> Self {
        MetadataLoader {
            meta_path: meta_path.into(),
        }
    }

    pub fn load_tables(&self) -> Option<TablesMetadata> {
        self.load_logged("tables.yaml")
    }

    pub fn load_mappings(&self) -> Option<MappingsMetadata> {
        self.load_logged("mappings.yaml")
    }

    fn load_logged<T: DeserializeOwned>(&self, file_name: &str) -> Option<T> {
        match self.load_yaml(file_name) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::error!("{err}");
                None
            }
        }
    }

    fn load_yaml<T: DeserializeOwned>(&self, file_name: &str) -> Result<Option<T>, SqlGenError> {
        let path = self.meta_path.join(file_name);
        if !path.exists() {
            tracing::warn!("metadata file not found: {}", path.display());
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|source| SqlGenError::MetadataReadError {
            path: path.clone(),
            source,
        })?;
        let parsed = serde_yaml::from_str(&text)
            .map_err(|source| SqlGenError::MetadataParseError { path, source })?;
        Ok(Some(parsed))
    }
}

/// `tables.yaml` — per-table generation policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TablesMetadata {
    pub defaults: Option<TablesDefaults>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TablesDefaults {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub generates: Option<GeneratesConfig>,
}

fn default_schema() -> String {
    "dbo".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableConfig {
    pub description: Option<String>,
    pub generates: Option<GeneratesConfig>,
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneratesConfig {
    pub entity: Option<EntityToggle>,
}

/// The `Entity` key takes either a boolean or an explicit struct name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EntityToggle {
    Enabled(bool),
    Named(String),
}

impl TablesMetadata {
    fn table_toggle(&self, table_name: &str) -> Option<&EntityToggle> {
        self.tables
            .get(table_name)
            .and_then(|config| config.generates.as_ref())
            .and_then(|generates| generates.entity.as_ref())
    }

    fn default_toggle(&self) -> Option<&EntityToggle> {
        self.defaults
            .as_ref()
            .and_then(|defaults| defaults.generates.as_ref())
            .and_then(|generates| generates.entity.as_ref())
    }

    /// Per-table setting wins outright when present; otherwise a boolean
    /// default applies. A named default is ignored — names are per-table.
    pub fn should_generate_entity(&self, table_name: &str) -> bool {
        if let Some(toggle) = self.table_toggle(table_name) {
            return match toggle {
                EntityToggle::Named(name) => !name.is_empty(),
                EntityToggle::Enabled(enabled) => *enabled,
            };
        }
        matches!(self.default_toggle(), Some(EntityToggle::Enabled(true)))
    }

    /// Explicit per-table name, else `<Table>Entity` when a boolean toggle
    /// (per-table or default) turns the entity on.
    pub fn entity_struct_name(&self, table_name: &str) -> Option<String> {
        if let Some(toggle) = self.table_toggle(table_name) {
            match toggle {
                EntityToggle::Named(name) if !name.is_empty() => return Some(name.clone()),
                EntityToggle::Enabled(true) => return Some(format!("{table_name}Entity")),
                _ => {}
            }
        }
        if matches!(self.default_toggle(), Some(EntityToggle::Enabled(true))) {
            return Some(format!("{table_name}Entity"));
        }
        None
    }

    pub fn excluded_columns(&self, table_name: &str) -> Option<&[String]> {
        self.tables
            .get(table_name)
            .and_then(|config| config.exclude.as_deref())
    }
}

/// `mappings.yaml` — DTO and message composition rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MappingsMetadata {
    pub output: Option<OutputConfig>,
    pub dtos: Option<BTreeMap<String, DtoConfig>>,
    pub messages: Option<BTreeMap<String, MessageConfig>>,
    pub type_mappings: Option<BTreeMap<String, String>>,
}

/// Module names the consuming codebase files these categories under.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputConfig {
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub dto: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DtoConfig {
    pub description: Option<String>,
    /// Single source table; mutually exclusive with `sources` in practice.
    pub source: Option<String>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub sources: Option<Vec<DtoSourceConfig>>,
    #[serde(default)]
    pub custom: bool,
    pub properties: Option<Vec<PropertyConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DtoSourceConfig {
    pub table: String,
    #[serde(default)]
    pub prefix: String,
    pub include: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageConfig {
    pub request: Option<MessagePartConfig>,
    pub response: Option<MessagePartConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessagePartConfig {
    pub description: Option<String>,
    pub properties: Option<Vec<PropertyConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyConfig {
    pub name: String,
    #[serde(rename = "Type")]
    pub property_type: String,
    #[serde(default)]
    pub nullable: bool,
}
