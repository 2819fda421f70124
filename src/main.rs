//! Strategy Town - game session server.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::sync::Arc;
use strategy_town::{
    AppState, Coordinator, GameContext, GameKind, MemoryStore, RoomHub, ServerConfig,
    SessionRegistry, SessionStore, SqliteStore, Transport, router,
};
use strum::IntoEnumIterator;
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            db,
        } => {
            let config = match config {
                Some(path) => ServerConfig::from_file(path)?,
                None => ServerConfig::default(),
            }
            .with_overrides(host, port, db);
            init_tracing(config.log_filter());
            run_server(config).await
        }
        Command::Kinds => {
            for kind in GameKind::iter() {
                let max = kind
                    .max_players()
                    .map_or_else(|| "any".to_string(), |n| n.to_string());
                println!("{:<8} {}..{} players", kind, kind.min_players(), max);
            }
            Ok(())
        }
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the game server until Ctrl-C.
#[instrument(skip_all, fields(address = %config.bind_address()))]
async fn run_server(config: ServerConfig) -> Result<()> {
    let store: Arc<dyn SessionStore> = match config.database() {
        Some(path) => {
            info!(path = %path, "Using SQLite session store");
            Arc::new(SqliteStore::open(path.clone())?)
        }
        None => {
            warn!("No database configured, sessions will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let hub = Arc::new(RoomHub::new(*config.channel_buffer()));
    let transport: Arc<dyn Transport> = hub.clone();
    let registry = SessionRegistry::new(store, GameContext::system());
    let coordinator = Coordinator::new(registry, transport);
    let app = router(AppState { coordinator, hub });

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Server ready at http://{}/", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
