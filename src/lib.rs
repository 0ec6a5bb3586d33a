//! Field Store - durable LocalStorage persistence for in-memory app state
//!
//! Core modules:
//! - `state`: The persisted data model (fields and images)
//! - `persistence`: Envelope, validation and the debounced gateway
//! - `platform`: Browser/native storage, timers and logging
//! - `error`: Internal error types

pub mod error;
pub mod persistence;
pub mod platform;
pub mod state;

pub use error::{LoadError, SaveError, ShapeError, StoreError};
pub use persistence::{
    GatewayConfig, PersistenceGateway, SAVE_DEBOUNCE_MS, STORAGE_KEY, STORAGE_SCHEMA,
    STORAGE_VERSION, StateEnvelope,
};
pub use platform::{KeyValueStore, ManualScheduler, MemoryStore, Scheduler};
pub use state::{AppState, Entity, Item};
