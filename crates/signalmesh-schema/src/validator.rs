use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Check one decoded payload, reporting at most `max_errors` violations.
pub(crate) fn validate_payload(
    signal: u16,
    payload: &Value,
    validator: &Validator,
    max_errors: usize,
) -> Result<()> {
    let errors: Vec<String> = validator
        .iter_errors(payload)
        .take(max_errors.max(1))
        .map(|err| match err.instance_path().to_string() {
            path if path.is_empty() => err.to_string(),
            path => format!("{path}: {err}"),
        })
        .collect();

    if errors.is_empty() {
        return Ok(());
    }
    Err(SchemaError::ValidationFailed {
        signal,
        message: errors.join("; "),
    })
}
