//! oledmon daemon
//!
//! Drives one or more SSD1306 panels and serves their live state over HTTP.
//!
//! Startup:
//! 1. Load configuration and apply command line overrides
//! 2. Open and initialize every display
//! 3. Bind the monitor
//! 4. Start one render thread per display
//!
//! Runs until Ctrl-C or until every render loop reaches its frame limit.

use anyhow::{Context, Result};
use clap::Parser;
use oledmon_config::OledmonConfig;
use oledmon_daemon::{Registry, RenderLoop, SharedDisplay, http, open_display};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "oledmon", version, about = "Drive SSD1306 OLED panels and serve their live state")]
struct Cli {
    /// Device specifications, e.g. `linux:1:3c` or `trace`; replaces the configured list
    devices: Vec<String>,

    /// Configuration file (default: ~/.config/oledmon/config.toml, then /etc/oledmon/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Monitor port
    #[arg(short, long)]
    port: Option<u16>,

    /// Pause between frames in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop each render loop after this many frames (0 = forever)
    #[arg(long)]
    frames: Option<u64>,

    /// Startup contrast in [0, 1]
    #[arg(long)]
    contrast: Option<f64>,

    /// Do not start the HTTP monitor
    #[arg(long)]
    no_monitor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    info!("oledmon {} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    let mut registry = Registry::new();
    let mut displays: Vec<SharedDisplay<_>> = Vec::new();
    for spec in &config.displays {
        let display = Arc::new(Mutex::new(open_display(spec, &config.render)?));
        registry.register(Arc::clone(&display))?;
        displays.push(display);
    }
    let registry = Arc::new(registry);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = if config.monitor.enabled {
        let addr = config.monitor.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind monitor on {}", addr))?;
        Some(tokio::spawn(http::serve(
            Arc::clone(&registry),
            listener,
            shutdown_rx,
        )))
    } else {
        info!("Monitor disabled");
        None
    };

    let stop = Arc::new(AtomicBool::new(false));
    let mut loops = Vec::new();
    for display in displays {
        let handle = RenderLoop::new(display, config.render.interval())
            .with_frames(config.render.frames)
            .with_stop(Arc::clone(&stop))
            .spawn()
            .context("Failed to spawn render thread")?;
        loops.push(handle);
    }

    let mut joined = tokio::task::spawn_blocking(move || {
        loops
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    });

    let results = tokio::select! {
        results = &mut joined => results,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down...");
            stop.store(true, Ordering::Relaxed);
            joined.await
        }
    };
    let results = results.context("Render threads could not be joined")?;

    for result in results {
        match result {
            Ok(stats) => info!(
                "Render loop finished: {} frames, {} failed",
                stats.frames, stats.failures
            ),
            Err(_) => error!("Render loop panicked"),
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(monitor) = monitor {
        match monitor.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Monitor failed: {}", e),
            Err(e) => error!("Monitor task failed: {}", e),
        }
    }

    info!("oledmon stopped");
    Ok(())
}

/// Setup logging to the console
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

/// Configuration file plus command line overrides
fn load_config(cli: &Cli) -> Result<OledmonConfig> {
    let mut config = OledmonConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if !cli.devices.is_empty() {
        config.displays = cli.devices.clone();
    }
    if let Some(port) = cli.port {
        config.monitor.port = port;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.render.interval_ms = interval_ms;
    }
    if let Some(frames) = cli.frames {
        config.render.frames = frames;
    }
    if let Some(contrast) = cli.contrast {
        config.render.contrast = contrast;
    }
    if cli.no_monitor {
        config.monitor.enabled = false;
    }

    config.validate().context("Invalid configuration")?;
    if config.displays.is_empty() {
        anyhow::bail!("No displays configured; pass device specs such as `linux:1:3c` or `trace`");
    }
    Ok(config)
}
