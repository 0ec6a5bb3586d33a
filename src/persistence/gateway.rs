//! Load/save/clear protocol between in-memory state and the key-value store
//!
//! - Reads are gated on schema + version and fully shape-checked.
//! - Writes are debounced: bursts of `save` calls collapse into one store
//!   write carrying the last state.
//! - Nothing here fails loudly. Bad data reads as "nothing saved" and failed
//!   writes are logged and dropped; the in-memory state stays authoritative.
//!
//! State machine:
//! ```text
//! Idle --save--> PendingFlush --timer/flush_now--> Idle (store write)
//! PendingFlush --save--> PendingFlush (buffer replaced, timer re-armed)
//! any --clear--> Idle (timer cancelled, key removed)
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::config::GatewayConfig;
use super::envelope::{self, STORAGE_SCHEMA, STORAGE_VERSION, StateEnvelope};
use crate::error::{LoadError, SaveError};
use crate::platform::storage::KeyValueStore;
use crate::platform::time::Scheduler;
use crate::state::AppState;

/// State shared between the gateway and its armed flush callback
struct Inner<S, H> {
    /// `None` when this execution context has no persistent store
    store: Option<S>,
    config: GatewayConfig,
    /// Latest state not yet written
    pending: RefCell<Option<AppState>>,
    /// The one armed flush, if any
    timer: RefCell<Option<H>>,
}

impl<S: KeyValueStore, H> Inner<S, H> {
    fn read(&self, store: &S) -> Result<Option<AppState>, LoadError> {
        let Some(raw) = store.get_item(&self.config.key)? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        envelope::decode(&raw).map(Some)
    }

    /// Write the pending state, if there is one. The buffer is empty
    /// afterwards whether or not the write landed.
    fn flush(&self) {
        let Some(state) = self.pending.borrow_mut().take() else {
            return;
        };
        let Some(store) = &self.store else {
            return;
        };

        let unusable = state.non_finite_timestamps();
        if unusable > 0 {
            log::warn!(
                "{} non-finite timestamps will be written as null; this save will not load back",
                unusable
            );
        }

        match write(store, &self.config.key, state) {
            Ok(bytes) => log::debug!("Persisted state ({} bytes)", bytes),
            Err(err) => log::warn!("Failed to persist state: {}", err),
        }
    }
}

fn write<S: KeyValueStore>(store: &S, key: &str, state: AppState) -> Result<usize, SaveError> {
    let json = StateEnvelope::new(state).to_json()?;
    store.set_item(key, &json)?;
    Ok(json.len())
}

/// Persistence gateway. Construct one per application and keep it for the
/// process lifetime.
pub struct PersistenceGateway<S, T: Scheduler> {
    inner: Rc<Inner<S, T::Handle>>,
    scheduler: T,
}

impl<S, T> PersistenceGateway<S, T>
where
    S: KeyValueStore + 'static,
    T: Scheduler,
    T::Handle: 'static,
{
    /// Gateway over an available store
    pub fn new(store: S, scheduler: T, config: GatewayConfig) -> Self {
        Self::from_parts(Some(store), scheduler, config)
    }

    /// Gateway for a context with no persistent store: every operation is a
    /// no-op and `load` always returns `None`
    pub fn unavailable(scheduler: T, config: GatewayConfig) -> Self {
        Self::from_parts(None, scheduler, config)
    }

    pub fn from_parts(store: Option<S>, scheduler: T, config: GatewayConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                store,
                config,
                pending: RefCell::new(None),
                timer: RefCell::new(None),
            }),
            scheduler,
        }
    }

    /// Schema tag written into every envelope
    pub fn schema(&self) -> &'static str {
        STORAGE_SCHEMA
    }

    /// Envelope version written and accepted by this build
    pub fn version(&self) -> u32 {
        STORAGE_VERSION
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Whether a persistent store backs this gateway
    pub fn is_available(&self) -> bool {
        self.inner.store.is_some()
    }

    /// Whether a save is waiting for its debounce window to close
    pub fn has_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    /// Recover previously saved state.
    ///
    /// Returns `None` when nothing was saved, when the stored record belongs
    /// to another schema or version, or when it fails any structural check.
    pub fn load(&self) -> Option<AppState> {
        let store = self.inner.store.as_ref()?;
        match self.inner.read(store) {
            Ok(Some(state)) => {
                log::info!(
                    "Loaded saved state ({} fields, {} images)",
                    state.entities.len(),
                    state.items.len()
                );
                Some(state)
            }
            Ok(None) => {
                log::debug!("No saved state under {:?}", self.inner.config.key);
                None
            }
            Err(err) => {
                log::warn!("Ignoring saved state: {}", err);
                None
            }
        }
    }

    /// Queue `state` to be written once the debounce window passes without
    /// another save. Replaces any state still waiting.
    pub fn save(&self, state: AppState) {
        if self.inner.store.is_none() {
            return;
        }

        *self.inner.pending.borrow_mut() = Some(state);
        self.disarm();

        let weak: Weak<Inner<S, T::Handle>> = Rc::downgrade(&self.inner);
        let handle = self.scheduler.schedule(
            self.inner.config.debounce(),
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                // Drops this callback's own handle mid-call; wasm-bindgen's
                // closure refcount defers freeing until the call returns.
                inner.timer.borrow_mut().take();
                inner.flush();
            }),
        );
        *self.inner.timer.borrow_mut() = Some(handle);
    }

    /// Write any pending state now instead of waiting for the timer.
    /// Hosts call this from page-hide or shutdown hooks.
    pub fn flush_now(&self) {
        self.disarm();
        self.inner.flush();
    }

    /// Forget everything: cancel the pending write and remove the stored key
    pub fn clear(&self) {
        let Some(store) = &self.inner.store else {
            return;
        };

        self.disarm();
        self.inner.pending.borrow_mut().take();

        match store.remove_item(&self.inner.config.key) {
            Ok(()) => log::info!("Saved state cleared"),
            Err(err) => log::warn!("Failed to clear saved state: {}", err),
        }
    }
}

impl<S, T: Scheduler> PersistenceGateway<S, T> {
    fn disarm(&self) {
        let armed = self.inner.timer.borrow_mut().take();
        if let Some(handle) = armed {
            self.scheduler.cancel(handle);
        }
    }
}

impl<S, T: Scheduler> Drop for PersistenceGateway<S, T> {
    fn drop(&mut self) {
        self.disarm();
    }
}
