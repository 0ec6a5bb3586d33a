//! Field Store demo entry point
//!
//! On the web this restores whatever the page saved last. Natively there is
//! no LocalStorage, so the demo drives the gateway over an in-memory store on
//! a virtual clock and logs each step.

#[cfg(target_arch = "wasm32")]
fn main() {
    use field_store::GatewayConfig;
    use field_store::platform::{default_gateway, init_logging};

    init_logging();
    let gateway = default_gateway(GatewayConfig::default());
    match gateway.load() {
        Some(state) => log::info!(
            "Restored {} fields / {} images",
            state.entities.len(),
            state.items.len()
        ),
        None => log::info!("Starting with empty state"),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::time::Duration;

    use field_store::platform::{init_logging, now_ms};
    use field_store::{
        AppState, Entity, GatewayConfig, Item, KeyValueStore, ManualScheduler, MemoryStore,
        PersistenceGateway, STORAGE_KEY,
    };

    init_logging();
    log::info!("Field Store (native) demo starting...");

    let store = MemoryStore::new();
    let clock = ManualScheduler::new();
    let gateway = PersistenceGateway::new(store.clone(), clock.clone(), GatewayConfig::default());
    log::info!(
        "Gateway schema {} v{}, debounce {:?}",
        gateway.schema(),
        gateway.version(),
        gateway.config().debounce()
    );

    let mut state = gateway.load().unwrap_or_default();
    state.entities.push(Entity {
        id: "field-1".to_string(),
        name: "Backyard".to_string(),
        created_at: now_ms(),
        member_ids: Vec::new(),
    });

    // A burst of edits, 50ms apart
    for n in 0..5 {
        let id = format!("image-{n}");
        state.items.push(Item {
            id: id.clone(),
            owner_id: "field-1".to_string(),
            payload: format!("blob:demo/{n}"),
            created_at: now_ms(),
            note: (n % 2 == 0).then(|| format!("shot {n}")),
        });
        state.entities[0].member_ids.push(id);
        gateway.save(state.clone());
        clock.advance(Duration::from_millis(50));
    }
    log::info!("After burst: {} store writes", store.write_count());

    clock.advance(gateway.config().debounce());
    log::info!("After quiet period: {} store writes", store.write_count());

    let restored = gateway.load();
    log::info!("Round trip intact: {}", restored.as_ref() == Some(&state));

    // Data from an older format version is ignored, not migrated
    let stale = serde_json::json!({ "version": 0, "state": AppState::new() });
    if let Err(err) = store.set_item(STORAGE_KEY, &stale.to_string()) {
        log::warn!("Could not write stale record: {err}");
    }
    log::info!("Stale record loads as: {:?}", gateway.load());

    gateway.clear();
    log::info!("Key present after clear: {}", store.contains_key(STORAGE_KEY));
}
