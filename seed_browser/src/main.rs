use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use seed_browser::{
    mod_info, BrowserSession, LocalSeedClient, RouteParams, SeedBrowserApp, SeedClient,
    SeedSummary, TcpSeedClient,
};
use seed_store::{SeedLibrary, SeedStore, StoreConfig};
use tokio::runtime::Handle;
use tracing::info;

#[derive(Clone)]
struct ChannelWriter {
    sender: Sender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = String::from_utf8(buf.to_vec()) {
            let _ = self.sender.send(text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal browser for shared world seeds", long_about = None)]
struct Cli {
    /// Address of the seed store server.
    #[arg(long, default_value = "127.0.0.1:42000")]
    endpoint: String,
    /// Serve from a local seed library file instead of the server.
    #[arg(long)]
    library: Option<PathBuf>,
    /// Give up on a fetch after this many milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse one seed.
    Seed { seed: String, version: String },
    /// Browse the seed named by a `/seeds/<seed>/<version>` path.
    Route { path: String },
    /// Show how to upload seeds from the game.
    ModInfo,
    /// Print the seed summary as JSON and exit.
    Print { seed: String, version: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Command::ModInfo => {
            print!("{}", mod_info::plain_text());
            Ok(())
        }
        Command::Print { ref seed, ref version } => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .compact()
                .init();
            print_summary(&cli, RouteParams::new(seed.clone(), version.clone())).await
        }
        Command::Seed { ref seed, ref version } => {
            let params = RouteParams::new(seed.clone(), version.clone());
            browse(&cli, params).await
        }
        Command::Route { ref path } => {
            let params = RouteParams::parse_path(path)?;
            browse(&cli, params).await
        }
    }
}

fn make_client(cli: &Cli) -> Result<Box<dyn SeedClient + Send>> {
    match &cli.library {
        Some(path) => {
            let library = SeedLibrary::from_file(path)?;
            info!(path = %path.display(), seeds = library.seeds.len(), "Serving seeds from local library");
            let store = SeedStore::from_library(library, StoreConfig::default().invalid_report_threshold);
            Ok(Box::new(LocalSeedClient::new(store)))
        }
        None => {
            info!("Fetching seeds from {}", cli.endpoint);
            Ok(Box::new(TcpSeedClient::new(
                cli.endpoint.clone(),
                Handle::current(),
                Duration::from_millis(cli.timeout_ms.max(1)),
            )))
        }
    }
}

async fn browse(cli: &Cli, params: RouteParams) -> Result<()> {
    let (log_tx, log_rx) = mpsc::channel::<String>();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_ansi(false)
        .with_writer(move || ChannelWriter {
            sender: log_tx.clone(),
        })
        .init();

    let client = make_client(cli)?;
    let session = BrowserSession::new(client, params);
    tokio::task::spawn_blocking(move || -> Result<()> {
        let app = SeedBrowserApp::new(session, log_rx)?;
        app.run()
    })
    .await?
}

async fn print_summary(cli: &Cli, params: RouteParams) -> Result<()> {
    let client = make_client(cli)?;
    let (seed, reference) = tokio::try_join!(
        client.fetch_seed(params.request()).wait(),
        client.fetch_reference_data().wait()
    )
    .map_err(|err| eyre!("failed to load {}: {err}", params.path()))?;
    let summary = SeedSummary::build(&seed, &reference);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
