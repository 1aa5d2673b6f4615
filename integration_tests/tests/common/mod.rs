#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Once;
use std::time::{Duration, Instant};

use seed_browser::{BrowserStore, SeedClient, SeedDetailView, SeedReader};
use seed_store::{start_seed_server, SeedLibrary, SeedServerHandle, SeedStore, StoreConfig};

static INIT: Once = Once::new();

/// Point the store config override at the fixture shipped with these tests.
pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixture_path("test_store_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test store config at {}",
            config_path.display()
        );

        std::env::set_var(seed_store::STORE_CONFIG_ENV, &config_path);
    });
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn sample_store(threshold: u32) -> SeedStore {
    SeedStore::from_library(SeedLibrary::builtin(), threshold)
}

/// Start a server on an ephemeral port backed by `store`.
pub fn spawn_server(store: SeedStore) -> anyhow::Result<SeedServerHandle> {
    let config = StoreConfig {
        bind: SocketAddr::from(([127, 0, 0, 1], 0)),
        worker_threads: 2,
        idle_timeout_ms: 2_000,
        ..StoreConfig::default()
    };
    Ok(start_seed_server(&config, store)?)
}

/// Poll the store and feed the view until it leaves the loading phase or `limit` elapses.
pub fn settle<C: SeedClient>(
    store: &mut BrowserStore<C>,
    view: &mut SeedDetailView,
    limit: Duration,
) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if store.poll() {
            view.on_update(&*store);
        }
        if !view.is_loading() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

pub fn loaded_seed_number<C>(store: &BrowserStore<C>) -> Option<i64> {
    store.snapshot().seed.as_ref().map(|seed| seed.seed_number)
}
