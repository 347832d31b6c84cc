//! Paintboard server binary.

use anyhow::Context;
use clap::Parser;
use paintboard_core::{CanvasService, FileStore};
use paintboard_server::{BroadcastHub, ServerConfig, autosave, console, router, shutdown};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "paintboard-server", version, about = "Shared pixel board server")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Directory holding the saved board, overrides the config file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Port to listen on, overrides the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "paintboard_server=info,paintboard_core=info,tower_http=info".into()
            }),
        )
        .init();

    let args = Args::parse();
    info!("Server starting...");

    let mut config = ServerConfig::load(&args.config)?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let started = Instant::now();
    let store = Arc::new(FileStore::new(&config.data_dir));
    let board_config = config.board_config();
    let service = tokio::task::spawn_blocking(move || CanvasService::open(board_config, store))
        .await?
        .with_context(|| format!("Failed to initialize board in {}", config.data_dir.display()))?;
    let service = Arc::new(service);
    info!(
        width = service.width(),
        height = service.height(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Board initialized"
    );

    let hub = BroadcastHub::new(service.clone());
    let stop = CancellationToken::new();

    let autosave_task = tokio::spawn(autosave::run(
        service.clone(),
        config.autosave_interval(),
        stop.child_token(),
    ));
    tokio::spawn(console::run(
        BufReader::new(tokio::io::stdin()),
        hub.clone(),
        stop.clone(),
    ));

    let listener = tokio::net::TcpListener::bind((config.hostname.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.hostname, config.port))?;
    let addr = listener.local_addr()?;
    info!("Paintboard server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/board/ws", addr);

    axum::serve(
        listener,
        router(hub.clone()).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::before_stop(hub.clone(), stop.clone()))
    .await?;

    stop.cancel();
    autosave_task.await?;
    shutdown::after_stop(&hub).await;
    info!("Server stopped.");
    Ok(())
}
