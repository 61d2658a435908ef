//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent
//! formatting and appropriate exit codes.

use std::fmt;
use std::process;
use vss_sdk::client::ClientError;
use vss_sdk::provider::ProviderError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// A value argument could not be parsed
    InvalidValue { raw: String, reason: String },
    /// Failed to wait for the interrupt signal
    Signal(std::io::Error),
    /// Client operation failed
    Client(ClientError),
    /// Provider operation failed
    Provider(ProviderError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Client(ClientError::NotConnected)
            | CliError::Provider(ProviderError::NotConnected) => {
                eprintln!();
                eprintln!("Is the databroker running? Check the --address flag.");
            }
            CliError::InvalidValue { .. } => {
                eprintln!();
                eprintln!("Use --kind to disambiguate, e.g. --kind uint32");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::InvalidValue { raw, reason } => {
                write!(f, "Cannot parse value '{}': {}", raw, reason)
            }
            CliError::Signal(e) => write!(f, "Failed to wait for Ctrl-C: {}", e),
            CliError::Client(e) => write!(f, "{}", e),
            CliError::Provider(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Signal(e) => Some(e),
            CliError::Client(e) => Some(e),
            CliError::Provider(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClientError> for CliError {
    fn from(e: ClientError) -> Self {
        CliError::Client(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}
