//! Link configuration — which link categories the graph builder computes.
//!
//! Each toggle is consulted *before* its category is resolved, so disabled
//! categories cost nothing. Absent fields fall back to the documented
//! defaults: all category toggles on, same-type links and declared-variable
//! type lookups off.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ModelError, Result};

/// Boolean toggles controlling graph link computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LinkConfig {
    /// Generalization and Realization links from base-type lists.
    #[serde(default = "default_true")]
    pub inheritance: bool,

    /// Field/property declared-type links.
    #[serde(default = "default_true")]
    pub member_types: bool,

    /// Parameter declared-type links.
    #[serde(default = "default_true")]
    pub parameter_types: bool,

    /// Statement-level type usage links.
    #[serde(default = "default_true")]
    pub statement_types: bool,

    /// Statement-level field/property usage links.
    #[serde(default = "default_true")]
    pub statement_fields: bool,

    /// Statement-level constructor/method usage links.
    #[serde(default = "default_true")]
    pub statement_calls: bool,

    /// Statement-level enum value usage links.
    #[serde(default = "default_true")]
    pub statement_enum_values: bool,

    /// Allow links between declarations whose type names are equal.
    /// Off by default: same-type noise drowns diagrams after renames.
    #[serde(default)]
    pub same_type_links: bool,

    /// Resolve statement receivers through declared local variables.
    /// Off by default; parameters are always consulted first regardless.
    #[serde(default)]
    pub declared_variable_types: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            inheritance: true,
            member_types: true,
            parameter_types: true,
            statement_types: true,
            statement_fields: true,
            statement_calls: true,
            statement_enum_values: true,
            same_type_links: false,
            declared_variable_types: false,
        }
    }
}

impl LinkConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ModelError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_categories_and_suppress_noise() {
        let config = LinkConfig::default();
        assert!(config.inheritance);
        assert!(config.member_types);
        assert!(config.statement_fields);
        assert!(!config.same_type_links);
        assert!(!config.declared_variable_types);
    }

    #[test]
    fn partial_toml_falls_back_per_field() {
        let config: LinkConfig = toml::from_str("inheritance = false\n").unwrap();
        assert!(!config.inheritance);
        assert!(config.member_types, "unlisted toggles keep their defaults");
        assert!(!config.same_type_links);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = LinkConfig::load(Path::new("does-not-exist.toml")).unwrap();
        assert!(config.inheritance);
    }
}
