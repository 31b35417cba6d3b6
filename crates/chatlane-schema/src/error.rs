/// Errors that can occur during schema loading and payload validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema for tag {tag:?}: {message}")]
    CompileFailed { tag: String, message: String },

    /// The payload failed schema validation.
    #[error("validation failed for tag {tag:?}: {message}")]
    ValidationFailed { tag: String, message: String },

    /// The schema or payload text is not valid JSON.
    #[error("not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A registry setting is out of range.
    #[error("invalid registry config: {0}")]
    InvalidConfig(String),

    /// No schema registered for the tag while schemas are required.
    #[error("no schema registered for tag {0:?}")]
    NoSchema(String),

    /// A schema was registered under a tag that cannot be carried on the wire.
    #[error("invalid tag: {0}")]
    InvalidTag(#[from] chatlane_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
