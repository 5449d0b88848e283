/// Errors that can occur during schema loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),

    /// The payload failed schema validation.
    #[error("validation failed for signal {signal:#06x}: {message}")]
    ValidationFailed { signal: u16, message: String },

    /// The schema text is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No schema registered for the given signal.
    #[error("no schema registered for signal {0:#06x}")]
    NoSchema(u16),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
