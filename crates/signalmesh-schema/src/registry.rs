use std::collections::BTreeMap;
use std::fs::{DirEntry, File, Metadata};
use std::io::Read;
use std::path::Path;

use jsonschema::Validator;
use serde_json::{Map, Value};
use signalmesh_wire::{signal_from_name, signal_name};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::validator::validate_payload;

const SCHEMA_SUFFIX: &str = ".schema.json";
const SIGNAL_PREFIX: &str = "signal_";

/// Keywords whose value is a map of sub-schemas.
const MAP_KEYWORDS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// Keywords whose value is a single sub-schema.
const SINGLE_KEYWORDS: [&str; 11] = [
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
];

/// Keywords whose value is an array of sub-schemas.
const ARRAY_KEYWORDS: [&str; 4] = ["prefixItems", "allOf", "anyOf", "oneOf"];

/// Keywords that only make sense on object schemas.
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

/// Signal-keyed registry of compiled JSON Schema validators.
pub struct SchemaRegistry {
    validators: BTreeMap<u16, Validator>,
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
            validators: BTreeMap::new(),
            config,
        }
    }

    /// Register a schema for a signal from a JSON string.
    pub fn register(&mut self, signal: u16, schema_json: &str) -> Result<()> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(signal, &schema)
    }

    /// Register a schema for a signal from a JSON value.
    pub fn register_value(&mut self, signal: u16, schema: &Value) -> Result<()> {
        let mut schema = schema.clone();
        if self.config.strict_mode {
            close_object_schemas(&mut schema);
        }

        let compiled = jsonschema::validator_for(&schema)
            .map_err(|err| SchemaError::CompileFailed(err.to_string()))?;

        debug!(signal, signal_name = signal_name(signal), "registered payload schema");
        self.validators.insert(signal, compiled);
        Ok(())
    }

    /// Load from embedded schema strings.
    pub fn from_embedded(schemas: &[(u16, &str)]) -> Result<Self> {
        let mut registry = Self::new();
        for (signal, schema) in schemas {
            registry.register(*signal, schema)?;
        }
        Ok(registry)
    }

    /// Load schemas from a directory.
    ///
    /// Recognized names are `signal_<code>.schema.json` (decimal code) and
    /// `<signal_name>.schema.json` (e.g. `build_started.schema.json`).
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        let mut loaded = 0usize;

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let Some((signal, content)) = read_schema_entry(&entry, &registry.config, loaded)?
            else {
                continue;
            };
            loaded += 1;
            registry.register(signal, &content)?;
        }

        Ok(registry)
    }

    /// Validate a decoded payload against its signal's schema.
    pub fn validate(&self, signal: u16, payload: &Value) -> Result<()> {
        match self.validators.get(&signal) {
            Some(validator) => {
                validate_payload(signal, payload, validator, self.config.max_reported_errors)
            }
            None if self.config.fail_on_missing_schema => Err(SchemaError::NoSchema(signal)),
            None => Ok(()),
        }
    }

    /// Check if a signal has a registered schema.
    pub fn has_schema(&self, signal: u16) -> bool {
        self.validators.contains_key(&signal)
    }

    /// Signals that have registered schemas, ascending.
    pub fn signals(&self) -> Vec<u16> {
        self.validators.keys().copied().collect()
    }

    /// Get registry configuration.
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
            .field("signals", &self.signals())
            .field("config", &self.config)
            .finish()
    }
}

/// Read one directory entry. `Ok(None)` means the entry is not a schema file.
fn read_schema_entry(
    entry: &DirEntry,
    config: &RegistryConfig,
    already_loaded: usize,
) -> Result<Option<(u16, String)>> {
    let file_name = entry.file_name();
    let file_name = file_name.to_string_lossy();
    let is_schema_file = file_name.to_ascii_lowercase().ends_with(SCHEMA_SUFFIX);
    let entry_path = entry.path();
    let path_metadata = std::fs::symlink_metadata(&entry_path)
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

    if path_metadata.file_type().is_symlink() {
        if is_schema_file {
            return Err(SchemaError::LoadFailed(format!(
                "refusing to load schema symlink: {file_name}"
            )));
        }
        return Ok(None);
    }
    if !path_metadata.is_file() || !is_schema_file {
        return Ok(None);
    }

    let signal = resolve_signal_from_file_name(&file_name).ok_or_else(|| {
        SchemaError::LoadFailed(format!("unrecognized schema filename: {file_name}"))
    })?;

    if already_loaded >= config.max_schemas_from_directory {
        return Err(SchemaError::LoadFailed(format!(
            "schema count exceeds configured max ({})",
            config.max_schemas_from_directory
        )));
    }

    let file = File::open(&entry_path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening {}: {err}", entry_path.display()))
    })?;
    let opened_metadata = file
        .metadata()
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

    if !same_file_identity(&path_metadata, &opened_metadata) {
        return Err(SchemaError::LoadFailed(format!(
            "schema file changed during load: {file_name}"
        )));
    }

    let max_bytes = config.max_schema_file_size;
    if opened_metadata.len() > max_bytes as u64 {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large ({} bytes): {file_name}",
            opened_metadata.len()
        )));
    }

    let mut content = String::new();
    file.take(max_bytes as u64 + 1)
        .read_to_string(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading {}: {err}", entry_path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file grew while reading: {file_name}"
        )));
    }

    Ok(Some((signal, content)))
}

fn resolve_signal_from_file_name(file_name: &str) -> Option<u16> {
    let lower = file_name.to_ascii_lowercase();
    let stem = lower.strip_suffix(SCHEMA_SUFFIX)?;

    if let Some(code) = stem.strip_prefix(SIGNAL_PREFIX) {
        return code.parse::<u16>().ok();
    }

    // Names only; numeric literals must use the `signal_` prefix.
    if stem.chars().all(|c| c.is_ascii_digit()) || stem.starts_with("0x") {
        return None;
    }
    signal_from_name(stem)
}

/// Inject `additionalProperties: false` into every object schema that does
/// not already decide it.
fn close_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            for key in MAP_KEYWORDS {
                if let Some(Value::Object(children)) = map.get_mut(key) {
                    children.values_mut().for_each(close_object_schemas);
                }
            }
            for key in SINGLE_KEYWORDS {
                if let Some(child) = map.get_mut(key) {
                    close_object_schemas(child);
                }
            }
            for key in ARRAY_KEYWORDS {
                if let Some(Value::Array(children)) = map.get_mut(key) {
                    children.iter_mut().for_each(close_object_schemas);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_object_schemas),
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

#[cfg(unix)]
fn same_file_identity(path_metadata: &Metadata, opened_metadata: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}

#[cfg(not(unix))]
fn same_file_identity(path_metadata: &Metadata, opened_metadata: &Metadata) -> bool {
    path_metadata.len() == opened_metadata.len()
}
