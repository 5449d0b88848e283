//! Optional JSON Schema admission for mesh payloads.
//!
//! Validate decoded payloads against JSON Schema 2020-12, keyed by signal
//! code. A payload that breaks its signal's contract is dropped before any
//! handler sees it.

pub mod config;
pub mod error;
pub mod registry;
pub mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
