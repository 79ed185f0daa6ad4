//! evbridge CLI
//!
//! Inspection tool for the evbridge add-on: validate the options file
//! and list input devices.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "evbridge")]
#[command(about = "Inspection tool for the evbridge add-on")]
#[command(version)]
struct Cli {
    /// Path to the add-on options file
    #[arg(short, long, default_value = "/data/options.json")]
    options: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the options file and show the resulting configuration
    Validate,

    /// List available input devices and whether they match the target
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let options_path: PathBuf = shellexpand::tilde(&cli.options).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&options_path),
        Commands::Devices => cmd_devices(&options_path),
    }
}

fn cmd_validate(options_path: &PathBuf) -> Result<()> {
    println!("Validating options: {}", options_path.display());

    let options = evbridge_config::read_options(options_path)
        .with_context(|| format!("Cannot read {}", options_path.display()))?;
    let config = evbridge_config::parse_options(&options);

    let mut hold: Vec<&str> = config.hold_buttons.iter().map(String::as_str).collect();
    hold.sort_unstable();

    println!("Options are valid!");
    println!("  Target contains: '{}'", config.target_contains);
    println!("  Event type: '{}'", config.event_type);
    println!("  Grab device: {}", config.grab_device);
    println!(
        "  Key map entries: {} (overrides={})",
        config.key_map.len(),
        config.key_overrides
    );
    println!(
        "  Scan map entries: {} (overrides={})",
        config.scan_map.len(),
        config.scan_overrides
    );
    println!("  Hold buttons: {}", hold.join(", "));
    println!(
        "  Hold delay/repeat: {:.2}s / {:.2}s",
        config.hold_delay.as_secs_f64(),
        config.hold_repeat.as_secs_f64()
    );

    Ok(())
}

fn cmd_devices(options_path: &PathBuf) -> Result<()> {
    let config = evbridge_config::load_config(options_path);
    let needle = config.target_contains.to_lowercase();

    println!("Available input devices:\n");

    for entry in std::fs::read_dir("/dev/input").context("Cannot list /dev/input")? {
        let entry = entry?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        match evdev::Device::open(&path) {
            Ok(device) => {
                let name = device.name().unwrap_or("Unknown");
                let id = device.input_id();
                let marker = if name.to_lowercase().contains(&needle) {
                    " [matches target]"
                } else {
                    ""
                };

                println!("  {}{}", name, marker);
                println!("    Path: {}", path.display());
                println!("    ID: {:04x}:{:04x}", id.vendor(), id.product());
                println!();
            }
            Err(_) => {
                // Skip devices we can't open
            }
        }
    }

    Ok(())
}
