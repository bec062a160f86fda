//! Database configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{errors::GraphDbError, literal::DEFAULT_EDGE_PREFIX};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Reject a CREATE placeholder that is not bound by a match but whose
    /// literal name already identifies a vertex or edge. When off, such a
    /// placeholder contracts into the existing entity.
    ///
    /// Default: `true`.
    pub strict_identities: bool,

    /// Prefix for generated edge identities.
    ///
    /// Default: `"edge"`.
    pub generated_name_prefix: String,

    /// Iteration count used for every statement when a query passes no
    /// explicit override.
    pub default_repeat: Option<usize>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            strict_identities: true,
            generated_name_prefix: DEFAULT_EDGE_PREFIX.to_string(),
            default_repeat: None,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_identities(mut self, strict: bool) -> Self {
        self.strict_identities = strict;
        self
    }

    pub fn with_generated_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.generated_name_prefix = prefix.into();
        self
    }

    pub fn with_default_repeat(mut self, repeat: Option<usize>) -> Self {
        self.default_repeat = repeat;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, GraphDbError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| GraphDbError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GraphDbError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GraphDbError::io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), GraphDbError> {
        let prefix = &self.generated_name_prefix;
        if prefix.is_empty() {
            return Err(GraphDbError::config("generated_name_prefix must not be empty"));
        }
        if !prefix
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        {
            return Err(GraphDbError::config(format!(
                "generated_name_prefix {prefix:?} contains characters not allowed in names"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = DatabaseConfig::from_json_str(r#"{"strict_identities": false}"#).unwrap();
        assert!(!config.strict_identities);
        assert_eq!(config.generated_name_prefix, "edge");
        assert_eq!(config.default_repeat, None);
        assert!(DatabaseConfig::from_json_str("{}").unwrap().strict_identities);
    }

    #[test]
    fn test_rejects_unknown_fields_and_bad_prefix() {
        assert!(matches!(
            DatabaseConfig::from_json_str(r#"{"strict": true}"#),
            Err(GraphDbError::Config(_))
        ));
        assert!(matches!(
            DatabaseConfig::from_json_str(r#"{"generated_name_prefix": "a b"}"#),
            Err(GraphDbError::Config(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = DatabaseConfig::new()
            .with_generated_name_prefix("rel")
            .with_default_repeat(Some(2));
        assert_eq!(config.generated_name_prefix, "rel");
        assert_eq!(config.default_repeat, Some(2));
    }
}
