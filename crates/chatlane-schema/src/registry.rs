use std::collections::HashMap;
use std::path::Path;

use chatlane_frame::validate_tag;
use jsonschema::Validator;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::validator::validate_value;

const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

/// Tag-keyed registry of compiled JSON Schema validators.
pub struct SchemaRegistry {
    validators: HashMap<String, Validator>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            validators: HashMap::new(),
            config,
        }
    }

    /// Register a schema for a tag from a JSON string.
    pub fn register(&mut self, tag: &str, schema_json: &str) -> Result<()> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(tag, &schema)
    }

    /// Register a schema for a tag from a JSON value.
    pub fn register_value(&mut self, tag: &str, schema: &Value) -> Result<()> {
        validate_tag(tag)?;

        let mut schema = schema.clone();
        if self.config.strict_mode {
            close_objects(&mut schema);
        }

        let compiled =
            jsonschema::validator_for(&schema).map_err(|err| SchemaError::CompileFailed {
                tag: tag.to_string(),
                message: err.to_string(),
            })?;

        debug!(tag, "schema registered");
        self.validators.insert(tag.to_string(), compiled);
        Ok(())
    }

    /// Load from embedded `(tag, schema)` strings.
    pub fn from_embedded(schemas: &[(&str, &str)]) -> Result<Self> {
        let mut registry = Self::new();
        for (tag, schema) in schemas {
            registry.register(tag, schema)?;
        }
        Ok(registry)
    }

    /// Load every `<tag>.schema.json` file in a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load every `<tag>.schema.json` file in a directory with explicit config.
    ///
    /// Other files are ignored. Symlinked schema files are refused.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let mut registry = Self::with_config(config);
        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        let mut loaded = 0usize;
        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Some(tag) = file_name.strip_suffix(SCHEMA_FILE_SUFFIX) else {
                continue;
            };

            let metadata = std::fs::symlink_metadata(entry.path())
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            if metadata.file_type().is_symlink() {
                return Err(SchemaError::LoadFailed(format!(
                    "refusing to load schema symlink: {file_name}"
                )));
            }
            if !metadata.is_file() {
                continue;
            }

            loaded += 1;
            if loaded > config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({})",
                    config.max_schemas_from_directory
                )));
            }
            if metadata.len() > config.max_schema_file_size as u64 {
                return Err(SchemaError::LoadFailed(format!(
                    "schema file too large ({} bytes): {file_name}",
                    metadata.len()
                )));
            }

            let content = std::fs::read_to_string(entry.path()).map_err(|err| {
                SchemaError::LoadFailed(format!("failed reading {file_name}: {err}"))
            })?;
            registry.register(tag, &content)?;
        }

        Ok(registry)
    }

    /// Validate a payload against its tag's schema.
    ///
    /// A tag without a schema passes unless the registry requires one.
    pub fn validate(&self, tag: &str, payload: &Value) -> Result<()> {
        match self.validators.get(tag) {
            Some(validator) => validate_value(tag, payload, validator),
            None if self.config.require_schema => {
                Err(SchemaError::NoSchema(tag.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Validate JSON payload text against its tag's schema.
    pub fn validate_json(&self, tag: &str, payload: &str) -> Result<()> {
        let value: Value = serde_json::from_str(payload)?;
        self.validate(tag, &value)
    }

    /// Check if a tag has a registered schema.
    pub fn has_schema(&self, tag: &str) -> bool {
        self.validators.contains_key(tag)
    }

    /// Tags with registered schemas, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("tags", &self.tags())
            .field("config", &self.config)
            .finish()
    }
}

const SUBSCHEMA_MAPS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

const SUBSCHEMA_SLOTS: [&str; 15] = [
    "propertyNames",
    "additionalProperties",
    "unevaluatedProperties",
    "items",
    "contains",
    "additionalItems",
    "unevaluatedItems",
    "not",
    "if",
    "then",
    "else",
    "prefixItems",
    "allOf",
    "anyOf",
    "oneOf",
];

const OBJECT_KEYWORDS: [&str; 8] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
    "required",
    "dependentRequired",
    "dependentSchemas",
    "propertyNames",
];

/// Close every object schema to undeclared properties, unless it says otherwise.
fn close_objects(schema: &mut Value) {
    match schema {
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for key in SUBSCHEMA_MAPS {
                if let Some(Value::Object(children)) = map.get_mut(key) {
                    children.values_mut().for_each(close_objects);
                }
            }
            for key in SUBSCHEMA_SLOTS {
                if let Some(child) = map.get_mut(key) {
                    close_objects(child);
                }
            }
        }
        _ => {}
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind == "object"),
        _ => OBJECT_KEYWORDS.iter().any(|keyword| map.contains_key(*keyword)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    const SELECTION_SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "choices": {
                "type": "array",
                "items": { "type": "integer", "minimum": 0, "maximum": 9 },
                "maxItems": 4
            }
        },
        "required": ["choices"]
    }"#;

    #[test]
    fn valid_payload_passes() {
        let mut registry = SchemaRegistry::new();
        registry.register("upd", SELECTION_SCHEMA).unwrap();
        assert!(registry.validate("upd", &json!({ "choices": [1, 2] })).is_ok());
    }

    #[test]
    fn out_of_range_payload_fails() {
        let mut registry = SchemaRegistry::new();
        registry.register("upd", SELECTION_SCHEMA).unwrap();

        let err = registry
            .validate("upd", &json!({ "choices": [1, 42] }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ValidationFailed { ref tag, .. } if tag == "upd"));
    }

    #[test]
    fn missing_schema_permissive_by_default() {
        let registry = SchemaRegistry::new();
        assert!(registry.validate("anything", &json!(null)).is_ok());
    }

    #[test]
    fn missing_schema_strict_fails() {
        let registry = SchemaRegistry::with_config(RegistryConfig {
            require_schema: true,
            ..RegistryConfig::default()
        });
        assert!(matches!(
            registry.validate("join", &json!({})),
            Err(SchemaError::NoSchema(tag)) if tag == "join"
        ));
    }

    #[test]
    fn strict_mode_rejects_additional_properties() {
        let mut permissive = SchemaRegistry::new();
        permissive.register("upd", SELECTION_SCHEMA).unwrap();
        let mut strict = SchemaRegistry::with_config(RegistryConfig {
            strict_mode: true,
            ..RegistryConfig::default()
        });
        strict.register("upd", SELECTION_SCHEMA).unwrap();

        let payload = json!({ "choices": [1], "extra": true });
        assert!(permissive.validate("upd", &payload).is_ok());
        assert!(matches!(
            strict.validate("upd", &payload),
            Err(SchemaError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn strict_mode_reaches_nested_objects() {
        let schema = json!({
            "type": "object",
            "properties": {
                "round": {
                    "properties": { "n": { "type": "integer" } },
                    "required": ["n"]
                }
            }
        });
        let mut strict = SchemaRegistry::with_config(RegistryConfig {
            strict_mode: true,
            ..RegistryConfig::default()
        });
        strict.register_value("time", &schema).unwrap();

        assert!(strict.validate("time", &json!({ "round": { "n": 1 } })).is_ok());
        assert!(strict
            .validate("time", &json!({ "round": { "n": 1, "extra": 0 } }))
            .is_err());
    }

    #[test]
    fn invalid_schema_fails_compile() {
        let mut registry = SchemaRegistry::new();
        assert!(matches!(
            registry.register("x", r#"{"type":"definitely-not-a-type"}"#),
            Err(SchemaError::CompileFailed { .. })
        ));
    }

    #[test]
    fn schema_under_invalid_tag_rejected() {
        let mut registry = SchemaRegistry::new();
        assert!(matches!(
            registry.register("bad%%tag", "{}"),
            Err(SchemaError::InvalidTag(_))
        ));
    }

    #[test]
    fn validate_json_parses_payload_text() {
        let registry = SchemaRegistry::from_embedded(&[("upd", SELECTION_SCHEMA)]).unwrap();
        assert!(registry.validate_json("upd", r#"{"choices":[0]}"#).is_ok());
        assert!(matches!(
            registry.validate_json("upd", "nope"),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn from_embedded_lists_sorted_tags() {
        let registry =
            SchemaRegistry::from_embedded(&[("upd", SELECTION_SCHEMA), ("join", "{}")]).unwrap();
        assert!(registry.has_schema("join"));
        assert_eq!(registry.tags(), vec!["join", "upd"]);
    }

    fn make_temp_schema_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "chatlane-schema-{label}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn from_directory_loads_schema_files_only() {
        let dir = make_temp_schema_dir("load");
        std::fs::write(dir.join("upd.schema.json"), SELECTION_SCHEMA).unwrap();
        std::fs::write(dir.join("join.schema.json"), "{}").unwrap();
        std::fs::write(dir.join("notes.json"), "{}").unwrap();

        let registry = SchemaRegistry::from_directory(&dir).unwrap();
        assert_eq!(registry.tags(), vec!["join", "upd"]);
        assert!(registry.validate("upd", &json!({ "choices": [3] })).is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn directory_limits_are_enforced() {
        let dir = make_temp_schema_dir("limits");
        std::fs::write(dir.join("a.schema.json"), SELECTION_SCHEMA).unwrap();
        std::fs::write(dir.join("b.schema.json"), SELECTION_SCHEMA).unwrap();

        let too_many = SchemaRegistry::from_directory_with_config(
            &dir,
            RegistryConfig {
                max_schemas_from_directory: 1,
                ..RegistryConfig::default()
            },
        );
        assert!(matches!(too_many, Err(SchemaError::LoadFailed(_))));

        let too_big = SchemaRegistry::from_directory_with_config(
            &dir,
            RegistryConfig {
                max_schema_file_size: 8,
                ..RegistryConfig::default()
            },
        );
        assert!(matches!(too_big, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_schema_is_rejected() {
        let dir = make_temp_schema_dir("symlink");
        let target = dir.join("target.json");
        std::fs::write(&target, "{}").unwrap();
        std::os::unix::fs::symlink(&target, dir.join("join.schema.json")).unwrap();

        assert!(matches!(
            SchemaRegistry::from_directory(&dir),
            Err(SchemaError::LoadFailed(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
