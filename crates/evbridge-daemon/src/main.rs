//! evbridge daemon
//!
//! Bridges button presses from matching evdev input devices into Home
//! Assistant events posted through the supervisor API.

mod credentials;
mod discovery;
mod dispatch;
mod event;
mod hold;
mod resolver;
mod session;
mod sink;
mod supervisor;
#[cfg(test)]
mod testutil;
mod throttle;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use evbridge_config::{parse_options, Config, LogLevel};

use crate::dispatch::Dispatcher;
use crate::sink::HttpEventSink;
use crate::supervisor::Supervisor;

#[derive(Parser, Debug)]
#[command(name = "evbridged")]
#[command(about = "evdev to Home Assistant event bridge")]
struct Args {
    /// Path to the add-on options file
    #[arg(short, long, default_value = "/data/options.json")]
    options: String,

    /// Base URL of the event API
    #[arg(long, default_value = sink::DEFAULT_API_BASE)]
    api_base: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let options_path: PathBuf = shellexpand::tilde(&args.options).into_owned().into();

    // Peek the configured level before installing the subscriber so the
    // option parse warnings come out through it.
    let raw_options = evbridge_config::read_options(&options_path);
    let log_level = raw_options
        .as_ref()
        .ok()
        .and_then(|v| v.get("log_level"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<LogLevel>().ok())
        .unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.as_filter())),
        )
        .init();

    tracing::info!("Loading options from {}", options_path.display());
    let config = Arc::new(match raw_options {
        Ok(options) => parse_options(&options),
        Err(err) => {
            tracing::warn!("Could not load options, using defaults: {}", err);
            Config::default()
        }
    });
    log_config(&config);

    let token = credentials::supervisor_token()
        .context("Cannot reach the event API without a supervisor token")?;

    let sink = HttpEventSink::new(
        &args.api_base,
        &config.event_type,
        token,
        config.event_post_timeout,
    )
    .context("Failed to build the event sink HTTP client")?;

    let mut dispatcher = Dispatcher::new(Arc::new(sink), config.event_queue_size);
    dispatcher.start();

    let supervisor = Supervisor::new(config.clone(), dispatcher.handle());

    tokio::select! {
        _ = supervisor.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
        }
    }

    dispatcher.stop().await;
    Ok(())
}

fn log_config(config: &Config) {
    let mut ignore: Vec<&str> = config.ignore_scancodes.iter().map(String::as_str).collect();
    ignore.sort_unstable();
    let mut hold: Vec<&str> = config.hold_buttons.iter().map(String::as_str).collect();
    hold.sort_unstable();

    tracing::info!("Target contains: '{}'", config.target_contains);
    tracing::info!("Output event_type: '{}'", config.event_type);
    tracing::info!("Grab device: {}", config.grab_device);
    tracing::info!("Ignore scancodes: [{}]", ignore.join(", "));
    tracing::info!("Hold buttons: [{}]", hold.join(", "));
    tracing::info!(
        "Key map entries: {} (overrides={})",
        config.key_map.len(),
        config.key_overrides
    );
    tracing::info!(
        "Scan map entries: {} (overrides={})",
        config.scan_map.len(),
        config.scan_overrides
    );
    tracing::info!(
        "Hold: delay={:.2}s repeat={:.2}s",
        config.hold_delay.as_secs_f64(),
        config.hold_repeat.as_secs_f64()
    );
    tracing::info!("Event queue size: {}", config.event_queue_size);
    tracing::info!(
        "Event post timeout: {:.1}s",
        config.event_post_timeout.as_secs_f64()
    );
}
