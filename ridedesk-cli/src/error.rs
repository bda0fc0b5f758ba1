//! CLI error type.

use std::fmt;

use ridedesk::api::ApiError;
use ridedesk::config::ConfigError;
use ridedesk::crud::CrudError;
use ridedesk::logging::LoggingError;
use ridedesk::map::MapError;
use ridedesk::tracking::ChannelError;

/// Errors surfaced to the user by the `ridedesk` binary.
#[derive(Debug)]
pub enum CliError {
    /// Bad arguments or configuration values.
    Config(String),
    ConfigFile(ConfigError),
    Api(ApiError),
    Crud(CrudError),
    Map(MapError),
    Channel(ChannelError),
    Logging(LoggingError),
    /// Terminal or prompt failure.
    Terminal(String),
    Io(std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::ConfigFile(_) => 2,
            CliError::Api(_) | CliError::Crud(_) => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Api(e) => write!(f, "{}", e.user_message()),
            CliError::Crud(e) => write!(f, "{}", e.user_message()),
            CliError::Map(e) => write!(f, "Map error: {}", e),
            CliError::Channel(e) => write!(f, "Live channel error: {}", e),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::Terminal(msg) => write!(f, "Terminal error: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Api(e) => Some(e),
            CliError::Crud(e) => Some(e),
            CliError::Map(e) => Some(e),
            CliError::Channel(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Config(_) | CliError::Terminal(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ApiError> for CliError {
    fn from(e: ApiError) -> Self {
        CliError::Api(e)
    }
}

impl From<CrudError> for CliError {
    fn from(e: CrudError) -> Self {
        CliError::Crud(e)
    }
}

impl From<MapError> for CliError {
    fn from(e: MapError) -> Self {
        CliError::Map(e)
    }
}

impl From<ChannelError> for CliError {
    fn from(e: ChannelError) -> Self {
        CliError::Channel(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
