//! Format-pluggable configuration loading.
//!
//! # Responsibilities
//! - Map format names to parser functions
//! - Decode a raw input stream into a validated Config
//!
//! # Design Decisions
//! - Format selection is decoupled from parsing, so new formats register
//!   without touching the loader
//! - Helpers return errors; only the binary turns an error into an exit

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::Config;
use crate::config::validation::{validate_config, ValidationError};

/// Parser contract: raw bytes in, normalized configuration tree out.
pub type ParseFn = fn(&[u8]) -> Result<Config, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration format \"{0}\" is already registered")]
    DuplicateFormat(String),

    #[error("unsupported configuration format \"{0}\"")]
    UnsupportedFormat(String),

    #[error("malformed {format} configuration: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Catalog mapping a format name to its parser.
#[derive(Default)]
pub struct FormatRegistry {
    formats: HashMap<String, ParseFn>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a format name with a parser. Duplicate names are a setup
    /// error.
    pub fn register(&mut self, name: &str, parse: ParseFn) -> Result<(), ConfigError> {
        match self.formats.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ConfigError::DuplicateFormat(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(parse);
                Ok(())
            }
        }
    }

    /// Decode and validate a configuration from a reader.
    pub fn load<R: Read>(&self, name: &str, mut reader: R) -> Result<Config, ConfigError> {
        let parse = self
            .formats
            .get(name)
            .ok_or_else(|| ConfigError::UnsupportedFormat(name.to_string()))?;

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).map_err(|source| ConfigError::Io {
            path: "<stream>".to_string(),
            source,
        })?;

        let config = parse(&raw)?;
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Decode and validate a configuration file.
    pub fn load_file(&self, name: &str, path: &Path) -> Result<Config, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load(name, file)
    }
}

/// Registry with the built-in formats registered.
pub fn builtin_formats() -> Result<FormatRegistry, ConfigError> {
    let mut registry = FormatRegistry::new();
    registry.register("json", parse_json)?;
    registry.register("toml", parse_toml)?;
    Ok(registry)
}

/// Infer a format name from the file extension; JSON is the default.
pub fn format_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("toml") => "toml",
        _ => "json",
    }
}

fn parse_json(raw: &[u8]) -> Result<Config, ConfigError> {
    serde_json::from_slice(raw).map_err(|err| ConfigError::Parse {
        format: "json",
        message: err.to_string(),
    })
}

fn parse_toml(raw: &[u8]) -> Result<Config, ConfigError> {
    let text = std::str::from_utf8(raw).map_err(|err| ConfigError::Parse {
        format: "toml",
        message: err.to_string(),
    })?;
    toml::from_str(text).map_err(|err| ConfigError::Parse {
        format: "toml",
        message: err.to_string(),
    })
}
