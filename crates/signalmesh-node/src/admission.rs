use std::sync::Arc;

use signalmesh_tumbler::Tumbler;
use signalmesh_wire::Message;

/// Pre-dispatch gates. A message must pass every attached gate.
#[derive(Debug, Clone, Default)]
pub(crate) struct Admission {
    pub(crate) tumbler: Option<Arc<Tumbler>>,
    #[cfg(feature = "schema")]
    pub(crate) schema: Option<Arc<signalmesh_schema::SchemaRegistry>>,
}

#[derive(Debug)]
pub(crate) enum Rejection {
    Whitelist,
    #[cfg(feature = "schema")]
    Schema(signalmesh_schema::SchemaError),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Whitelist => f.write_str("signal not whitelisted"),
            #[cfg(feature = "schema")]
            Rejection::Schema(err) => write!(f, "{err}"),
        }
    }
}

impl Admission {
    pub(crate) fn admit(&self, message: &Message) -> Result<(), Rejection> {
        if let Some(tumbler) = &self.tumbler {
            if !tumbler.is_allowed(message.signal) {
                return Err(Rejection::Whitelist);
            }
        }

        #[cfg(feature = "schema")]
        if let Some(schema) = &self.schema {
            schema
                .validate(message.signal, &message.payload)
                .map_err(Rejection::Schema)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use signalmesh_wire::{BUILD_STARTED, LESSON_EXTRACTED};

    use super::*;

    #[test]
    fn no_gates_admits_everything() {
        let admission = Admission::default();
        assert!(admission.admit(&Message::new(0xFFFF, json!(null))).is_ok());
    }

    #[test]
    fn tumbler_gate_rejects_unlisted_signals() {
        let tumbler = Arc::new(Tumbler::new("gate", [BUILD_STARTED]));
        let admission = Admission {
            tumbler: Some(Arc::clone(&tumbler)),
            ..Admission::default()
        };

        assert!(admission.admit(&Message::new(BUILD_STARTED, json!({}))).is_ok());
        assert!(matches!(
            admission.admit(&Message::new(LESSON_EXTRACTED, json!({}))),
            Err(Rejection::Whitelist)
        ));
        assert_eq!(tumbler.stats().rejected, 1);
    }

    #[cfg(feature = "schema")]
    #[test]
    fn schema_gate_rejects_invalid_payloads() {
        let mut registry = signalmesh_schema::SchemaRegistry::new();
        registry
            .register(
                BUILD_STARTED,
                r#"{"type":"object","required":["build_id"]}"#,
            )
            .unwrap();
        let admission = Admission {
            schema: Some(Arc::new(registry)),
            ..Admission::default()
        };

        assert!(admission
            .admit(&Message::new(BUILD_STARTED, json!({"build_id": "b-1"})))
            .is_ok());
        assert!(matches!(
            admission.admit(&Message::new(BUILD_STARTED, json!({}))),
            Err(Rejection::Schema(_))
        ));
    }
}
