//! Versioned JSON envelope around the persisted state
//!
//! Format:
//! ```text
//! { "schema": "field_v1", "version": 1, "state": { "fields": [..], "images": [..] } }
//! ```
//!
//! Records written before the schema tag existed carry only `version` and
//! `state`; they are read as if tagged with the current schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::check_state;
use crate::error::LoadError;
use crate::state::AppState;

/// Tag identifying the data family in the envelope
pub const STORAGE_SCHEMA: &str = "field_v1";
/// Envelope format version. Bumping it abandons all previously saved data.
pub const STORAGE_VERSION: u32 = 1;

/// The record written under the storage key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEnvelope {
    pub schema: String,
    pub version: u32,
    pub state: AppState,
}

impl StateEnvelope {
    /// Wrap `state` with the current schema tag and version
    pub fn new(state: AppState) -> Self {
        Self {
            schema: STORAGE_SCHEMA.to_string(),
            version: STORAGE_VERSION,
            state,
        }
    }

    /// Whether this envelope may be consumed by the current build
    pub fn is_current(&self) -> bool {
        self.schema == STORAGE_SCHEMA && self.version == STORAGE_VERSION
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Decode a raw stored string into a state the current build can trust
pub fn decode(raw: &str) -> Result<AppState, LoadError> {
    let Value::Object(mut record) = serde_json::from_str::<Value>(raw)? else {
        return Err(LoadError::NotARecord);
    };

    let schema = match record.get("schema") {
        None => STORAGE_SCHEMA,
        Some(Value::String(schema)) => schema.as_str(),
        Some(_) => return Err(LoadError::SchemaNotString),
    };
    let version = record
        .get("version")
        .and_then(Value::as_f64)
        .ok_or(LoadError::MissingVersion)?;

    if schema != STORAGE_SCHEMA {
        return Err(LoadError::SchemaMismatch {
            found: schema.to_string(),
        });
    }
    if version != f64::from(STORAGE_VERSION) {
        return Err(LoadError::VersionMismatch { found: version });
    }

    let state = record.remove("state").unwrap_or(Value::Null);
    check_state(&state)?;
    Ok(serde_json::from_value(state)?)
}
