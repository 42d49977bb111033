// security policy: built-in defaults, partial overrides, toml files

use crate::Error;
use crate::core::{DataSensitivity, SecurityRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataClassificationRule {
    pub level: DataSensitivity,
    /// Case-insensitive substrings of table names.
    pub patterns: Vec<String>,
}

impl DataClassificationRule {
    pub fn matches(&self, table: &str) -> bool {
        let table = table.to_lowercase();
        self.patterns
            .iter()
            .any(|p| table.contains(&p.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// "*" allows every schema.
    pub allowed_schemas: BTreeSet<String>,
    pub blocked_functions: BTreeSet<String>,
    pub max_complexity: u32,
    pub require_explicit_permissions: bool,
    pub read_only_mode: bool,
    pub custom_rules: Vec<SecurityRule>,
    pub data_classification_rules: Vec<DataClassificationRule>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_schemas: BTreeSet::from(["public".to_string()]),
            blocked_functions: BTreeSet::new(),
            max_complexity: 75,
            require_explicit_permissions: false,
            read_only_mode: false,
            custom_rules: Vec::new(),
            data_classification_rules: Vec::new(),
        }
    }
}

// partial config, as found in config files and per-call options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfigOverrides {
    pub allowed_schemas: Option<BTreeSet<String>>,
    pub blocked_functions: Option<BTreeSet<String>>,
    pub max_complexity: Option<u32>,
    pub require_explicit_permissions: Option<bool>,
    pub read_only_mode: Option<bool>,
    pub custom_rules: Vec<SecurityRule>,
    pub data_classification_rules: Vec<DataClassificationRule>,
}

impl SecurityConfig {
    pub fn merged(&self, overrides: &SecurityConfigOverrides) -> Self {
        let mut config = self.clone();
        if let Some(schemas) = &overrides.allowed_schemas {
            config.allowed_schemas.clone_from(schemas);
        }
        if let Some(functions) = &overrides.blocked_functions {
            config.blocked_functions.clone_from(functions);
        }
        if let Some(max) = overrides.max_complexity {
            config.max_complexity = max;
        }
        if let Some(explicit) = overrides.require_explicit_permissions {
            config.require_explicit_permissions = explicit;
        }
        if let Some(read_only) = overrides.read_only_mode {
            config.read_only_mode = read_only;
        }
        config
            .custom_rules
            .extend(overrides.custom_rules.iter().cloned());
        config
            .data_classification_rules
            .extend(overrides.data_classification_rules.iter().cloned());
        config
    }

    pub fn allows_schema(&self, schema: &str) -> bool {
        self.allowed_schemas
            .iter()
            .any(|s| s == "*" || s.eq_ignore_ascii_case(schema))
    }

    pub fn blocks_function(&self, function: &str) -> bool {
        self.blocked_functions
            .iter()
            .any(|f| f.eq_ignore_ascii_case(function))
    }
}

pub fn load(path: &Path) -> Result<SecurityConfigOverrides, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text)
}

pub fn parse(text: &str) -> Result<SecurityConfigOverrides, Error> {
    Ok(toml::from_str(text)?)
}
