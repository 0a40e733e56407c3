//! Error types for sqlgen

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading schemas and generating code
#[derive(Error, Debug)]
pub enum SqlGenError {
    #[error("Configuration file not found: {path}")]
    ConfigMissing { path: PathBuf },

    #[error("Failed to read configuration file: {path}")]
    ConfigReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file: {path}")]
    ConfigParseError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read SQL file: {path}")]
    SqlFileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQL parse error in {path} at line {line}: {message}")]
    SqlParseError {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to connect to SQL Server: {message}")]
    ConnectionError { message: String },

    #[error("Catalog query failed ({operation}): {message}")]
    CatalogQueryError { operation: String, message: String },

    #[error("Failed to read metadata file: {path}")]
    MetadataReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata file: {path}")]
    MetadataParseError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write generated file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<tiberius::error::Error> for SqlGenError {
    fn from(err: tiberius::error::Error) -> Self {
        SqlGenError::ConnectionError {
            message: err.to_string(),
        }
    }
}
