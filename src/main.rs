// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the air quality polling daemon

use anyhow::Result;
use clap::Parser;
use log::info;

use std::path::PathBuf;
use tokio::signal;

use rust_airquality::config::Config;
use rust_airquality::poller::PollerDaemon;

/// Local air quality sensor polling daemon
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Poll interval in seconds (overrides the configuration file)
    #[arg(long)]
    interval: Option<u64>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration; an absent default file yields the defaults, but
    // an explicitly requested file must exist
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else if args.config.is_some() {
        return Err(anyhow::anyhow!(
            "Configuration file does not exist: {}",
            config_path.display()
        ));
    } else {
        Config::default()
    };

    // Apply command line overrides
    config.apply_args(args.interval);
    config.validate()?;

    info!("Starting in daemon mode");
    let mut daemon = PollerDaemon::new(config.polling.clone());

    // Register the sensors configured for startup; further registrations
    // and unregistrations arrive from consumers at runtime
    for sensor in &config.sensors {
        daemon
            .register_node(
                &sensor.id,
                &sensor.address,
                sensor.temp_offset,
                sensor.humidity_offset,
            )
            .await;
    }
    info!("Registered {} sensor(s) from configuration", config.sensors.len());

    daemon.start();

    // Wait for termination signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
            daemon.shutdown();
            daemon.join().await?;
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }

    Ok(())
}
