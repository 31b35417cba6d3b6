use serde::Deserialize;

use crate::error::{Result, SchemaError};

/// How a [`SchemaRegistry`](crate::SchemaRegistry) treats payloads and
/// schema files.
///
/// Missing fields take their defaults when read from JSON:
///
/// ```
/// use chatlane_schema::RegistryConfig;
///
/// let config = RegistryConfig::from_json(r#"{ "require_schema": true }"#).unwrap();
/// assert!(config.require_schema);
/// assert!(!config.strict_mode);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Close every object schema, so a payload carrying a field its schema
    /// does not declare fails validation.
    pub strict_mode: bool,
    /// Treat the registered tags as the whole logic-lane vocabulary.
    ///
    /// A payload under a tag with no schema fails with
    /// [`SchemaError::NoSchema`]. Handler dispatch then drops it as malformed
    /// and its handler never runs. Off by default: unknown-to-the-registry
    /// tags pass through unvalidated.
    pub require_schema: bool,
    /// Most `<tag>.schema.json` files one directory may hold.
    pub max_schemas_from_directory: usize,
    /// Largest schema file accepted from a directory, in bytes.
    pub max_schema_file_size: usize,
}

impl RegistryConfig {
    /// Strict objects and a closed tag set.
    pub fn closed() -> Self {
        Self {
            strict_mode: true,
            require_schema: true,
            ..Self::default()
        }
    }

    /// Parse a config from JSON text and validate it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_schemas_from_directory == 0 {
            return Err(SchemaError::InvalidConfig(
                "max_schemas_from_directory must be at least 1".to_string(),
            ));
        }
        // "{}" is the smallest schema there is.
        if self.max_schema_file_size < 2 {
            return Err(SchemaError::InvalidConfig(
                "max_schema_file_size must be at least 2 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            require_schema: false,
            max_schemas_from_directory: 128,
            max_schema_file_size: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_config_requires_and_closes() {
        let config = RegistryConfig::closed();
        assert!(config.strict_mode);
        assert!(config.require_schema);
        assert_eq!(
            config.max_schemas_from_directory,
            RegistryConfig::default().max_schemas_from_directory
        );
    }

    #[test]
    fn json_limits_are_validated() {
        let err = RegistryConfig::from_json(r#"{ "max_schemas_from_directory": 0 }"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig(_)));

        let err = RegistryConfig::from_json(r#"{ "fail_on_missing": true }"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson(_)));
    }
}
