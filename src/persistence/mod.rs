//! Save/load persistence with shape verification
//!
//! Features:
//! - Versioned JSON envelope with a schema tag
//! - Structural validation of everything read back
//! - Debounced, coalesced writes
//! - Stale or corrupt data treated as "nothing saved"

pub mod config;
pub mod envelope;
pub mod gateway;
pub mod validation;

pub use config::{GatewayConfig, SAVE_DEBOUNCE_MS, STORAGE_KEY};
pub use envelope::{STORAGE_SCHEMA, STORAGE_VERSION, StateEnvelope};
pub use gateway::PersistenceGateway;
