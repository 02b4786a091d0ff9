//! CLI error handling with user-facing messages.
//!
//! Every command returns `Result<(), CliError>`; `main` prints the error and
//! exits with the code of its category.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilelayer::config::ConfigFileError;
use tilelayer::coord::CoordError;
use tilelayer::divider::DividerError;
use tilelayer::layer::LayerError;

/// CLI errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Layer definition or lifecycle failure
    Layer(LayerError),
    /// Malformed or out-of-range tile
    Tile(CoordError),
    /// Tile could not be subdivided
    Divide(DividerError),
    /// Reading an input file failed
    FileRead { path: PathBuf, error: std::io::Error },
    /// Invalid command-line usage not caught by argument parsing
    Usage(String),
}

impl CliError {
    /// Exit code for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) | CliError::Tile(_) => 2,
            CliError::Config(_) | CliError::Layer(_) | CliError::FileRead { .. } => 3,
            CliError::LoggingInit(_) | CliError::Divide(_) => 1,
        }
    }

    /// Print the error with any hint and exit.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value or run 'tilelayer config init --force' to reset the file.");
            }
            CliError::Tile(_) => {
                eprintln!();
                eprintln!("Tile ids have the form <zoom>_<row>_<column>, e.g. 3_2_5");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Layer(e) => write!(f, "Layer error: {}", e),
            CliError::Tile(e) => write!(f, "Invalid tile: {}", e),
            CliError::Divide(e) => write!(f, "Cannot divide tile: {}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read '{}': {}", path.display(), error)
            }
            CliError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Layer(e) => Some(e),
            CliError::Tile(e) => Some(e),
            CliError::Divide(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<LayerError> for CliError {
    fn from(e: LayerError) -> Self {
        CliError::Layer(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Tile(e)
    }
}

impl From<DividerError> for CliError {
    fn from(e: DividerError) -> Self {
        CliError::Divide(e)
    }
}
