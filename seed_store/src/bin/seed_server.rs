use std::process::ExitCode;

use tracing::{error, info};

use seed_store::{load_seed_library, load_store_config_from_env, start_seed_server, SeedStore};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, config_path) = load_store_config_from_env();

    let library = match load_seed_library(&config) {
        Ok(library) => library,
        Err(err) => {
            error!(target: "seed_store::server", error = %err, "seed_library.load_failed");
            return ExitCode::FAILURE;
        }
    };
    let store = SeedStore::from_library(library, config.invalid_report_threshold);

    let server = match start_seed_server(&config, store.clone()) {
        Ok(server) => server,
        Err(err) => {
            error!(
                target: "seed_store::server",
                bind = %config.bind,
                error = %err,
                "server.bind_failed"
            );
            return ExitCode::FAILURE;
        }
    };

    info!(
        target: "seed_store::server",
        bind = %server.local_addr(),
        seeds = store.seed_count(),
        report_threshold = store.report_threshold(),
        config = ?config_path,
        "Seed store server ready"
    );

    server.wait();
    ExitCode::SUCCESS
}
