//! BGH CLI - read and control a BGH Smart Control AC unit from the command line

use anyhow::{anyhow, Context, Result};
use bgh_client::{BghClient, Notification};
use bgh_core::{fan_name, parse_fan, Mode, Status};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::{Overrides, PolicyKind};

/// BGH - talk to a BGH Smart Control air conditioner over UDP
#[derive(Parser)]
#[command(name = "bgh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (default: <config dir>/bgh/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// IP address of the AC unit
    #[arg(short = 'H', long, global = true, env = "BGH_HOST")]
    host: Option<String>,

    /// How to keep status fresh
    #[arg(short, long, global = true, value_enum)]
    policy: Option<PolicyKind>,

    /// Device command port
    #[arg(long, global = true)]
    command_port: Option<u16>,

    /// Local port status frames arrive on
    #[arg(long, global = true)]
    listen_port: Option<u16>,

    /// Fixed source port for commands
    #[arg(long, global = true)]
    source_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current status
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print every status update until Ctrl+C
    Watch {
        /// Print as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Set operating mode (off, cool, heat, dry, fan_only, auto)
    SetMode {
        mode: String,

        /// Fan speed (low, medium, high, or a raw value)
        #[arg(short, long)]
        fan: Option<String>,
    },

    /// Set target temperature in °C
    SetTemp { celsius: f64 },

    /// Turn the unit off
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    let file = config::load(cli.config.as_deref())?;
    let overrides = Overrides {
        host: cli.host.clone(),
        policy: cli.policy,
        command_port: cli.command_port,
        listen_port: cli.listen_port,
        source_port: cli.source_port,
    };
    let builder = file.builder(&overrides)?;

    // Validate arguments before touching the network
    let action = match cli.command {
        Commands::SetMode { mode, fan } => {
            let mode: Mode = mode.parse()?;
            let fan = fan
                .map(|f| parse_fan(&f).ok_or_else(|| anyhow!("invalid fan speed: {}", f)))
                .transpose()?;
            Action::SetMode(mode, fan)
        }
        Commands::Status { json } => Action::Status { json },
        Commands::Watch { json } => Action::Watch { json },
        Commands::SetTemp { celsius } => Action::SetTemp(celsius),
        Commands::Off => Action::Off,
    };

    let client = builder.connect().await.context("failed to connect")?;
    info!("Connected to {}", client.config().host);

    let result = run(&client, action).await;
    client.close().await;
    result
}

enum Action {
    Status { json: bool },
    Watch { json: bool },
    SetMode(Mode, Option<u8>),
    SetTemp(f64),
    Off,
}

async fn run(client: &BghClient, action: Action) -> Result<()> {
    match action {
        Action::Status { json } => {
            let status = client
                .get_status()
                .await
                .ok_or_else(|| anyhow!("no status from {}", client.config().host))?;
            print_status(&status, json)?;
        }

        Action::Watch { json } => {
            println!(
                "{} Watching {} (Ctrl+C to stop)",
                "BGH".cyan().bold(),
                client.config().host
            );
            let mut updates = client.subscribe();
            if let Some(status) = client.cached_status() {
                print_status(&status, json)?;
            }

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received shutdown signal");
                        break;
                    }
                    next = updates.next() => match next {
                        Some(Notification::Status(status)) => print_status(&status, json)?,
                        Some(Notification::Lagged(n)) => {
                            eprintln!("{} {} updates skipped", "WARN".yellow(), n)
                        }
                        None => break,
                    }
                }
            }
        }

        Action::SetMode(mode, fan) => {
            client.set_mode(mode, fan).await?;
            println!("{} Mode set to {}", "OK".green().bold(), mode.to_string().yellow());
        }

        Action::SetTemp(celsius) => {
            client.set_temperature(celsius).await?;
            println!(
                "{} Target set to {}",
                "OK".green().bold(),
                format!("{:.1}°C", celsius).yellow()
            );
        }

        Action::Off => {
            client.turn_off().await?;
            println!("{} Unit turned off", "OK".green().bold());
        }
    }

    Ok(())
}

fn print_status(status: &Status, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(status)?);
        return Ok(());
    }

    let power = if status.is_on {
        "ON".green().bold()
    } else {
        "OFF".red().bold()
    };
    let fan = fan_name(status.fan_speed)
        .map(str::to_string)
        .unwrap_or_else(|| status.fan_speed.to_string());

    println!(
        "{}  mode {} ({})  fan {}  room {:.1}°C  target {:.1}°C",
        power,
        status.mode.to_string().cyan(),
        status.mode_raw,
        fan,
        status.current_temperature,
        status.target_temperature
    );
    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
