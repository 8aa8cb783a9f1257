//! Vehicle API CLI
//!
//! Serves the live vehicle signal store and queries a running instance.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vehicle_api::{
    ChangeNotifier, NotifyConfig, NotifyTarget, ServerConfig, VehicleClient, VehicleServer,
    DEFAULT_PORT,
};
use vehicle_core::{Scalar, SignalStore};
use vehicle_sim::{SimulationConfig, SimulationProfile, Simulator, DEFAULT_TICK_INTERVAL_MS};

#[derive(Parser)]
#[command(name = "vehicle-api")]
#[command(author, version, about = "Live vehicle signal API with sensor simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,

    /// Server address for client commands
    #[arg(long, env = "VEHICLE_API_ADDR", default_value = "127.0.0.1:9000", global = true)]
    addr: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the signal store and run the simulator
    Serve {
        /// Listen address
        #[arg(long, env = "VEHICLE_API_BIND", default_value_t = format!("0.0.0.0:{}", DEFAULT_PORT))]
        bind: String,

        /// Simulator tick interval in milliseconds
        #[arg(long, env = "VEHICLE_SIM_TICK_MS", default_value_t = DEFAULT_TICK_INTERVAL_MS)]
        tick_ms: u64,

        /// TOML simulation profile (default: speed, RPM, outside temperature)
        #[arg(long, env = "VEHICLE_SIM_PROFILE")]
        profile: Option<PathBuf>,

        /// RNG seed for a reproducible simulation
        #[arg(long)]
        seed: Option<u64>,

        /// Serve static values without the simulator
        #[arg(long)]
        no_sim: bool,

        /// Forward writes to a sibling service (ADDRESS=URL, repeatable)
        #[arg(long = "notify")]
        notify: Vec<NotifyTarget>,

        /// Timeout for each forwarded write in milliseconds
        #[arg(long, default_value = "1000")]
        notify_timeout_ms: u64,
    },

    /// Print every signal
    Info,

    /// Read one signal
    Get {
        /// Signal address, e.g. Doors.DriverDoor
        address: String,
    },

    /// Write one signal
    Set {
        /// Signal address, e.g. Lights.Headlights
        address: String,

        /// New value (JSON scalar; anything else is taken as text)
        value: String,
    },

    /// Show service status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Serve {
            bind,
            tick_ms,
            profile,
            seed,
            no_sim,
            notify,
            notify_timeout_ms,
        } => {
            serve(
                bind,
                tick_ms,
                profile,
                seed,
                no_sim,
                notify,
                notify_timeout_ms,
            )
            .await?;
        }
        Commands::Info => {
            let mut client = connect(&cli.addr).await?;
            let signals = client.read_all().await?;
            println!("{}", serde_json::to_string_pretty(&signals)?);
        }
        Commands::Get { address } => {
            let mut client = connect(&cli.addr).await?;
            let value = client.read(&address).await?;
            println!("{}", json!({ address: value }));
        }
        Commands::Set { address, value } => {
            let mut client = connect(&cli.addr).await?;
            let stored = client.write(&address, parse_value(&value)).await?;
            println!("{}", json!({ address: stored }));
        }
        Commands::Status => {
            let mut client = connect(&cli.addr).await?;
            let status = client.status().await?;
            println!("Service: {} v{}", status.service, status.version);
            println!("Started: {}", status.started_at.to_rfc3339());
            println!("Signals: {}", status.signal_count);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn serve(
    bind: String,
    tick_ms: u64,
    profile: Option<PathBuf>,
    seed: Option<u64>,
    no_sim: bool,
    notify: Vec<NotifyTarget>,
    notify_timeout_ms: u64,
) -> Result<()> {
    info!("Vehicle API starting up");

    let store = SignalStore::new().into_shared();

    let simulator = if no_sim {
        info!("Simulator disabled");
        None
    } else {
        let profile = match &profile {
            Some(path) => SimulationProfile::load(path)
                .with_context(|| format!("loading simulation profile {}", path.display()))?,
            None => SimulationProfile::default(),
        };
        let config = SimulationConfig {
            tick_interval_ms: tick_ms,
            seed,
            profile,
        };
        Some(Simulator::new(store.clone(), config)?.spawn())
    };

    let notifier = ChangeNotifier::new(NotifyConfig {
        targets: notify,
        timeout_ms: notify_timeout_ms,
    })?;

    let config = ServerConfig {
        bind_addr: bind,
        ..Default::default()
    };
    let server = VehicleServer::bind(&config, store)
        .await?
        .with_notifier(notifier);

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    if let Some(handle) = simulator {
        handle.abort();
    }

    Ok(())
}

async fn connect(addr: &str) -> Result<VehicleClient> {
    VehicleClient::connect(addr)
        .await
        .with_context(|| format!("connecting to vehicle API at {}", addr))
}

/// Parse a CLI value as a JSON scalar, falling back to plain text
fn parse_value(raw: &str) -> Scalar {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|value| Scalar::try_from(value).ok())
        .unwrap_or_else(|| Scalar::Text(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Scalar::Int(42));
        assert_eq!(parse_value("22.5"), Scalar::Float(22.5));
        assert_eq!(parse_value("true"), Scalar::Bool(true));
        assert_eq!(parse_value("\"OPEN\""), Scalar::from("OPEN"));
        assert_eq!(parse_value("OPEN"), Scalar::from("OPEN"));
        assert_eq!(parse_value("{\"a\":1}"), Scalar::from("{\"a\":1}"));
    }

    #[test]
    fn test_cli_parses_serve_flags() {
        let cli = Cli::try_parse_from([
            "vehicle-api",
            "serve",
            "--bind",
            "127.0.0.1:9100",
            "--tick-ms",
            "500",
            "--seed",
            "7",
            "--notify",
            "InsideTemperature=http://hvac:8080/api/v1/hvac",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve {
                bind,
                tick_ms,
                seed,
                notify,
                no_sim,
                ..
            } => {
                assert_eq!(bind, "127.0.0.1:9100");
                assert_eq!(tick_ms, 500);
                assert_eq!(seed, Some(7));
                assert!(!no_sim);
                assert_eq!(notify.len(), 1);
                assert_eq!(notify[0].address, "InsideTemperature");
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_cli_parses_set() {
        let cli = Cli::try_parse_from([
            "vehicle-api",
            "--addr",
            "10.0.0.2:9000",
            "set",
            "Doors.DriverDoor",
            "OPEN",
        ])
        .unwrap();

        assert_eq!(cli.addr, "10.0.0.2:9000");
        assert!(matches!(
            cli.command,
            Commands::Set { ref address, ref value } if address == "Doors.DriverDoor" && value == "OPEN"
        ));
    }
}
