//! Vinyl Player (vinyl-player) - Main entry point
//!
//! Wires configuration, catalog, backends, coordinator and sequencer into the
//! HTTP/WebSocket server, and drains the command queue on shutdown so
//! playback is stopped before exit.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vinyl_common::config::TomlConfig;
use vinyl_common::events::EventBus;
use vinyl_common::protocol::DEFAULT_VOLUME_VALUE;
use vinyl_player::api::{self, AppContext};
use vinyl_player::audio::{AudioOutput, DeviceSink};
use vinyl_player::backend::{LocalBackend, RemoteBackend, SpotifyClient};
use vinyl_player::catalog::{CatalogReader, JsonCatalog};
use vinyl_player::config::{Config, Overrides};
use vinyl_player::playback::{lock_coordinator, Coordinator, SequencerHandle};
use vinyl_player::SharedState;

/// Command-line arguments for vinyl-player
#[derive(Parser, Debug)]
#[command(name = "vinyl-player")]
#[command(about = "Playback coordinator for the Vinyl media-library server")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "VINYL_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "VINYL_PORT")]
    port: Option<u16>,

    /// Data folder holding library.json and static/
    #[arg(short, long, env = "VINYL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TOML bootstrap file
    #[arg(short, long, env = "VINYL_CONFIG")]
    config: Option<PathBuf>,

    /// Natural-finish poll interval in milliseconds (250-5000)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Output device name (default device when omitted)
    #[arg(long)]
    audio_device: Option<String>,

    /// Log the available output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    let config = Config::resolve(
        Overrides {
            host: args.host,
            port: args.port,
            data_dir: args.data_dir,
            poll_interval_ms: args.poll_interval_ms,
            audio_device: args.audio_device,
        },
        toml,
    );

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "vinyl_player={0},vinyl_common={0},tower_http=debug",
                config.log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to enumerate audio devices")? {
            info!("Output device: {}", name);
        }
        return Ok(());
    }

    info!("Starting Vinyl Player v{}", env!("CARGO_PKG_VERSION"));
    info!("Data folder: {}", config.data_dir.display());

    let catalog: Arc<dyn CatalogReader> = Arc::new(JsonCatalog::load(&config.data_dir));
    let events = EventBus::new(config.event_capacity);

    let sink = DeviceSink::open(config.audio_device.clone(), DEFAULT_VOLUME_VALUE)
        .context("Failed to open audio output")?;

    let spotify = SpotifyClient::new(&config.spotify);
    if !spotify.is_configured() {
        info!("No streaming credentials configured, remote playback disabled");
    }

    let coordinator = Arc::new(Mutex::new(Coordinator::new(
        LocalBackend::new(Box::new(sink)),
        RemoteBackend::new(Box::new(spotify)),
        catalog,
        events.clone(),
    )));
    let snapshots = lock_coordinator(&coordinator).subscribe();
    let state = Arc::new(SharedState::new(snapshots, events));

    let sequencer = Arc::new(SequencerHandle::spawn(coordinator.clone()).context("Failed to start sequencer")?);

    let ctx = AppContext {
        state,
        coordinator,
        sequencer: Arc::clone(&sequencer),
        config: Arc::new(config),
    };

    let served = api::run(ctx, shutdown_signal()).await;

    info!("Draining command queue");
    if let Err(e) = tokio::task::spawn_blocking(move || sequencer.shutdown()).await {
        error!("Sequencer shutdown failed: {}", e);
    }

    served.context("Server error")?;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
