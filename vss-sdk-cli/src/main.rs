//! VSS SDK CLI - command-line client for the databroker.
//!
//! Exercises both roles of the SDK: the client facade (probe, get, set,
//! publish, subscribe) and the provider engine (provide).

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::ValueKindArg;
use error::CliError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vss-sdk")]
#[command(version = vss_sdk::VERSION)]
#[command(about = "Client for the VSS databroker", long_about = None)]
struct Cli {
    /// Databroker address (host:port, scheme optional)
    #[arg(long, global = true, default_value = "127.0.0.1:55555")]
    address: String,

    /// Also write logs to this file under logs/
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect and verify the databroker is alive
    Probe,

    /// Read the current value of a signal
    Get {
        /// Signal path, e.g. Vehicle.Speed
        path: String,
    },

    /// Command an actuator's target value
    Set {
        /// Actuator path
        path: String,
        /// Target value
        value: String,
        /// Value kind (inferred from the literal if omitted)
        #[arg(long, value_enum)]
        kind: Option<ValueKindArg>,
    },

    /// Report a sensor value
    Publish {
        /// Sensor path
        path: String,
        /// Reported value
        value: String,
        /// Value kind (inferred from the literal if omitted)
        #[arg(long, value_enum)]
        kind: Option<ValueKindArg>,
    },

    /// Subscribe to signals and print updates until interrupted
    Subscribe {
        /// Signal paths
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Claim actuators and echo commanded values back as actual values
    Provide {
        /// Actuator paths to own
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn init_logging(log_file: Option<&str>) -> Result<Option<vss_sdk::logging::LoggingGuard>, CliError> {
    match log_file {
        Some(file) => vss_sdk::logging::init_logging(vss_sdk::logging::default_log_dir(), file)
            .map(Some)
            .map_err(|e| CliError::LoggingInit(e.to_string())),
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _logging_guard = match init_logging(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => e.exit(),
    };

    let result = match cli.command {
        Command::Probe => commands::probe::run(&cli.address).await,
        Command::Get { path } => commands::get::run(&cli.address, &path).await,
        Command::Set { path, value, kind } => {
            commands::set::run(&cli.address, &path, &value, kind).await
        }
        Command::Publish { path, value, kind } => {
            commands::publish::run(&cli.address, &path, &value, kind).await
        }
        Command::Subscribe { paths } => commands::subscribe::run(&cli.address, paths).await,
        Command::Provide { paths } => commands::provide::run(&cli.address, paths).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}
