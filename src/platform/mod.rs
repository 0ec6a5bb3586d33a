//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Storage (LocalStorage on web, in-memory natively)
//! - Time and deferred callbacks
//! - Logging backends

pub mod storage;
pub mod time;

pub use storage::{KeyValueStore, MemoryStore};
pub use time::{ManualScheduler, Scheduler, now_ms};

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
#[cfg(target_arch = "wasm32")]
pub use time::BrowserScheduler;

use crate::persistence::{GatewayConfig, PersistenceGateway};

/// Gateway type backing [`default_gateway`] on this platform
#[cfg(target_arch = "wasm32")]
pub type PlatformGateway = PersistenceGateway<LocalStorage, BrowserScheduler>;

/// Gateway type backing [`default_gateway`] on this platform
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformGateway = PersistenceGateway<MemoryStore, ManualScheduler>;

/// Gateway over the window's LocalStorage. Without a window (workers, or
/// storage disabled by the user) every operation is a no-op.
#[cfg(target_arch = "wasm32")]
pub fn default_gateway(config: GatewayConfig) -> PlatformGateway {
    let scheduler = BrowserScheduler::new();
    match LocalStorage::open() {
        Some(store) if scheduler.is_available() => {
            log::info!("Persisting state to LocalStorage ({:?})", config.key);
            PersistenceGateway::new(store, scheduler, config)
        }
        _ => {
            log::warn!("LocalStorage unavailable, state will not persist");
            PersistenceGateway::unavailable(scheduler, config)
        }
    }
}

/// Native stub: there is no persistent store outside the browser
#[cfg(not(target_arch = "wasm32"))]
pub fn default_gateway(config: GatewayConfig) -> PlatformGateway {
    log::info!("No persistent store on native, state will not persist");
    PersistenceGateway::unavailable(ManualScheduler::new(), config)
}

/// Install the logger and panic hook for this platform. Safe to call twice.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Logger already set: {err}").into());
    }
}

/// Install the logger and panic hook for this platform. Safe to call twice.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}
