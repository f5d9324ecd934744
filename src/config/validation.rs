//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject empty type identifiers
//! - Enforce unique instance tags within the outbound and inbound sections
//! - Enforce at most one app per type
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: Config → Result<(), Vec<ValidationError>>
//! - Settings payloads stay opaque here; constructors validate their own

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{Config, Declaration};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{section} declaration {index} has an empty type")]
    EmptyType { section: &'static str, index: usize },

    #[error("duplicate {section} tag \"{tag}\"")]
    DuplicateTag { section: &'static str, tag: String },

    #[error("app \"{type_tag}\" is declared more than once")]
    DuplicateApp { type_tag: String },
}

/// Semantic checks over a parsed configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut app_types = HashSet::new();
    for (index, declaration) in config.apps.iter().enumerate() {
        if declaration.type_tag.is_empty() {
            errors.push(ValidationError::EmptyType {
                section: "app",
                index,
            });
        } else if !app_types.insert(declaration.type_tag.clone()) {
            errors.push(ValidationError::DuplicateApp {
                type_tag: declaration.type_tag.clone(),
            });
        }
    }

    check_section("outbound", &config.outbounds, &mut errors);
    check_section("inbound", &config.inbounds, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_section(
    section: &'static str,
    declarations: &[Declaration],
    errors: &mut Vec<ValidationError>,
) {
    let mut tags = HashSet::new();
    for (index, declaration) in declarations.iter().enumerate() {
        if declaration.type_tag.is_empty() {
            errors.push(ValidationError::EmptyType { section, index });
        }
        if let Some(tag) = &declaration.tag {
            if !tags.insert(tag.clone()) {
                errors.push(ValidationError::DuplicateTag {
                    section,
                    tag: tag.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(type_tag: &str, tag: Option<&str>) -> Declaration {
        Declaration {
            type_tag: type_tag.to_string(),
            tag: tag.map(str::to_string),
            settings: serde_json::Value::Null,
        }
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let config = Config {
            apps: vec![declaration("dispatch", None), declaration("dispatch", None)],
            outbounds: vec![
                declaration("freedom", Some("a")),
                declaration("blackhole", Some("a")),
            ],
            inbounds: vec![declaration("", None)],
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::DuplicateApp {
            type_tag: "dispatch".to_string()
        }));
        assert!(errors.contains(&ValidationError::DuplicateTag {
            section: "outbound",
            tag: "a".to_string()
        }));
        assert!(errors.contains(&ValidationError::EmptyType {
            section: "inbound",
            index: 0
        }));
    }

    #[test]
    fn untagged_declarations_never_collide() {
        let config = Config {
            outbounds: vec![declaration("freedom", None), declaration("freedom", None)],
            ..Config::default()
        };
        assert!(validate_config(&config).is_ok());
    }
}
