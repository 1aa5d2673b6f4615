//! Seed store service for the seed browser.
//!
//! Holds seed records and reference lookups in memory, counts invalid-seed
//! reports, and answers framed requests over TCP via [`start_seed_server`].

pub mod config;
pub mod library;
pub mod server;
mod store;

pub use config::{load_store_config_from_env, StoreConfig, StoreConfigError, STORE_CONFIG_ENV};
pub use library::{load_seed_library, LibraryError, SeedLibrary};
pub use server::{start_seed_server, SeedServerHandle};
pub use store::{SeedStore, StoreError};
