//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilecascade::config::ConfigFileError;
use tilecascade::coord::CoordError;
use tilecascade::engine::EngineError;
use tilecascade::source::SourceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Invalid location or zoom on the command line
    Location(CoordError),
    /// Tile source could not be created
    Source(SourceError),
    /// Engine stopped unexpectedly or rejected a request
    Engine(EngineError),
    /// Failed to write a tile to disk
    FileWrite { path: String, error: std::io::Error },
    /// Deadline passed before every tile arrived
    Incomplete { missing: usize, total: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Source(SourceError::Http { .. }) | CliError::Incomplete { .. } => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Tile server unreachable: check the url_template in [source]");
                eprintln!("  2. Server rejects the client: set user_agent in [source]");
                eprintln!("  3. Slow server: raise --deadline-secs or [fetch] timeout_secs");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Check the file passed with --config.");
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
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Location(e) => write!(f, "Invalid location: {}", e),
            CliError::Source(e) => write!(f, "Failed to create tile source: {}", e),
            CliError::Engine(e) => write!(f, "Tile engine error: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
            CliError::Incomplete { missing, total } => {
                write!(f, "{} of {} tiles still missing at deadline", missing, total)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Location(e) => Some(e),
            CliError::Source(e) => Some(e),
            CliError::Engine(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Location(e)
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Source(e)
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}
