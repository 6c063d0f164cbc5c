//! userd - user record service
//!
//! Binary entry point: wire config -> store -> registry -> HTTP server.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use userd::cli::{Cli, Command};
use userd::config::Config;
use userd::registry::UserRegistry;
use userd::server;
use userstore::UserStore;

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Status) => cmd_status(&config),
        Some(Command::Serve { port }) => cmd_serve(config, port).await,
        None => cmd_serve(config, None).await,
    }
}

/// Print the persisted user count.
fn cmd_status(config: &Config) -> Result<()> {
    let store = UserStore::open(&config.storage.db_path).context("Failed to open user store")?;
    let count = store.count().context("Failed to read user count")?;

    println!("Database: {}", config.storage.db_path.display());
    println!("Persisted users: {count}");
    Ok(())
}

/// Run the HTTP server until ctrl-c.
///
/// The registry is constructed exactly once here and handed to consumers as
/// a cloneable handle; there is no global instance.
async fn cmd_serve(mut config: Config, port_override: Option<u16>) -> Result<()> {
    if let Some(port) = port_override {
        config.server.port = port;
    }

    let store = Arc::new(UserStore::open(&config.storage.db_path).context("Failed to open user store")?);
    info!(db_path = %config.storage.db_path.display(), "user store opened");

    let registry = UserRegistry::spawn(store);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {addr}"))?;

    server::run(listener, registry).await
}
