//! # UV Index Widget Entry Point
//!
//! This binary wires the library together: it loads `uv-config.toml`, spawns
//! the fetch helper, and runs the Poller with a terminal renderer until
//! Ctrl+C. `--once` performs a single fetch (with retries), prints the panel
//! and exits, which is handy for checking a new location.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use argh::FromArgs;
use chrono::Local;
use tokio::sync::watch;
use uv_index_lib::channel::{bus, spawn_helper, BUS_CAPACITY};
use uv_index_lib::config::Config;
use uv_index_lib::poller::{DisplayState, Poller};
use uv_index_lib::renderer::{draw_panel, AsciiRenderer, View};
use uv_index_lib::uv_data::Fetcher;
use uv_index_lib::FetchOutcome;

#[derive(FromArgs)]
/// Current and forecast UV index for a smart-mirror display
struct Args {
    /// path to the configuration file (default: uv-config.toml)
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// fetch once, print the panel and exit
    #[argh(switch)]
    once: bool,
}

/// Single fetch through the retrying client, no Poller involved.
async fn run_once(config: &Config) -> anyhow::Result<()> {
    let (latitude, longitude) = config
        .poll_config()
        .coordinates()
        .context("latitude and longitude must be set in the config file")?;

    let fetcher = Fetcher::http(config.api.base_url.clone());
    match fetcher.fetch(latitude, longitude).await {
        FetchOutcome::Success(snapshot) => {
            let view = View {
                state: DisplayState::Ready,
                snapshot: Some(&snapshot),
            };
            let header = config.header();
            println!(
                "{}",
                draw_panel(&view, &config.display, header.as_deref(), &Local::now())
            );
            Ok(())
        }
        FetchOutcome::Failure { message, .. } => {
            Err(anyhow::anyhow!("UV fetch failed: {}", message))
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    if args.once {
        return run_once(&config).await;
    }

    // Helper side: owns the HTTP client and the retry loop
    let (poller_port, helper_port) = bus(BUS_CAPACITY);
    let _helper = spawn_helper(Fetcher::http(config.api.base_url.clone()), helper_port);

    // Shutdown on Ctrl+C
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Keep the sender alive so the Poller does not read this as shutdown
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down gracefully...");
        let _ = shutdown_tx.send(());
    });

    // Display side
    let renderer = AsciiRenderer::stdout(config.display.clone(), config.header());
    let poller = Poller::new(config.poll_config(), poller_port.requests, renderer);
    let poller = poller.run(poller_port.notifications, shutdown_rx).await;
    if poller.is_in_flight() {
        log::info!("Discarding outcome of in-flight UV request");
    }

    log::info!("UV widget shut down, exiting");
    Ok(())
}
