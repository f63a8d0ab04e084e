//! CoAP-to-MQTT bridge CLI
//!
//! Standalone bridge binary: connects to the MQTT broker, assembles the
//! CoAP resource tree, and serves until terminated.

use anyhow::{Context, Result};
use clap::Parser;
use coap2mqtt::coap::{CoapServer, TimeResource, Welcome, WhoAmI};
use coap2mqtt::{BridgeConfig, BridgeResource, LocationDirectory, MqttPublisher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// CoAP-to-MQTT sensor telemetry bridge
#[derive(Parser, Debug)]
#[command(name = "coap2mqtt")]
#[command(version)]
#[command(about = "Bridges CoAP sensor telemetry to an MQTT broker", long_about = None)]
struct Args {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON log format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting CoAP-to-MQTT bridge"
    );

    // Load configuration
    let config: BridgeConfig = if let Some(config_path) = &args.config {
        info!(path = %config_path.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        serde_json::from_str(&content).context("failed to parse configuration")?
    } else {
        BridgeConfig::default()
    };

    // Build the location directory; duplicate identifiers abort startup
    let directory = Arc::new(
        LocationDirectory::build(
            config.locations.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .context("invalid location table")?,
    );
    info!(entries = directory.len(), "location directory loaded");

    // Broker session
    info!(
        host = %config.mqtt.host,
        port = config.mqtt.port,
        "connecting to MQTT broker"
    );
    let publisher = Arc::new(MqttPublisher::connect(&config.mqtt));

    let bridge = BridgeResource::new(config.topic.default_base.as_str(), directory, publisher);

    // Resource tree
    let mut server = CoapServer::new();
    server.add_resource("", Arc::new(Welcome));
    server.add_resource_with_link("time", Arc::new(TimeResource), "title=\"Current time\"");
    server.add_resource("whoami", Arc::new(WhoAmI));
    server.add_resource_with_link("sensor", Arc::new(bridge), "rt=\"sensor-bridge\"");

    server
        .run((config.coap.bind_addr.as_str(), config.coap.bind_port))
        .await
}
