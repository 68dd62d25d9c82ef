mod command;
mod config;
mod connection;
mod console;
mod transport;

use anyhow::{Context, Result};
use clap::Parser;
use command::{listener, CommandExecutor};
use config::DeviceConfig;
use connection::ConnectionManager;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Answer AWS IoT command executions by hand from a console
#[derive(Parser, Debug)]
#[command(name = "command-device", version, about)]
struct Cli {
    /// Path to configuration file (default: ./command-device.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Thing name (overrides config)
    #[arg(short, long)]
    thing: Option<String>,

    /// Broker host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Broker port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_overrides(&self, config: &mut DeviceConfig) {
        if let Some(thing) = &self.thing {
            config.thing_name = thing.clone();
        }
        if let Some(host) = &self.host {
            config.mqtt.host = host.clone();
        }
        if let Some(port) = self.port {
            config.mqtt.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is left to the console
    let level = if cli.verbose > 0 { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let mut config = DeviceConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    info!("Command device starting: {}", config.thing_name);
    info!("  Broker: {}:{}", config.mqtt.host, config.mqtt.port);
    info!("  TLS: {}", if config.tls.is_some() { "on" } else { "off" });

    let (connection, events) = ConnectionManager::new(&config)?;

    let executor = Arc::new(
        CommandExecutor::new(config.topics(), Arc::new(connection.publisher()))
            .with_result_encoding(config.result_encoding),
    );

    // Background listener: inbound messages and new requests
    let listener = tokio::spawn(listener::run(events, executor.clone()));

    // Foreground console
    console::run(&executor, BufReader::new(tokio::io::stdin())).await?;

    info!("Shutting down");
    connection.shutdown().await;
    listener.abort();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["command-device", "--thing", "dev-9", "--port", "8883"]);
        let mut config = DeviceConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.thing_name, "dev-9");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.host, "localhost");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
