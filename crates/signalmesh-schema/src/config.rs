/// Limits and policy for a [`SchemaRegistry`](crate::SchemaRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Close every object schema (`additionalProperties: false`) on registration.
    pub strict_mode: bool,
    /// Treat a signal with no registered schema as a validation failure.
    pub fail_on_missing_schema: bool,
    /// Directory loading stops with an error past this many schema files.
    pub max_schemas_from_directory: usize,
    /// Largest schema file accepted from a directory, in bytes.
    pub max_schema_file_size: usize,
    /// Validation errors folded into one `ValidationFailed` message.
    pub max_reported_errors: usize,
}

impl RegistryConfig {
    /// Defaults with strict mode and missing-schema rejection both on.
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            fail_on_missing_schema: true,
            ..Self::default()
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            fail_on_missing_schema: false,
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
            max_reported_errors: 4,
        }
    }
}
