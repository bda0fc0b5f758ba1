//! Persistent configuration.
//!
//! Settings live in `<config_dir>/ridedesk/config.ini` and are edited with
//! `ridedesk config get|set|list|path`. [`ConfigFile`] turns them into the
//! runtime configs the view-models take (`ApiConfig`, `TrackingConfig`,
//! `MapConfig`, ...).

mod error;
mod file;
mod keys;

pub use error::{ConfigError, ConfigResult};
pub use file::{
    config_directory, config_file_path, ApiSection, ConfigFile, LoggingSection, MapSection,
    TrackingSection, DEFAULT_API_URL, ENV_API_TOKEN, ENV_API_URL,
};
pub use keys::{ConfigKey, MIN_POLL_INTERVAL_MS};
