//! Shared startup for commands that talk to the backend.

use std::sync::Arc;

use ridedesk::api::{ApiClient, ReqwestApiClient};
use ridedesk::config::ConfigFile;
use ridedesk::logging::{init_logging, LoggingGuard, DEFAULT_LOG_FILE};
use ridedesk::map::{InMemoryEngine, MapLibraryLoader, MapSessions};
use tracing::info;

use crate::error::CliError;

/// The map stack used by terminal views.
pub struct TerminalMap {
    pub engine: Arc<InMemoryEngine>,
    pub sessions: Arc<MapSessions>,
    pub loader: Arc<MapLibraryLoader>,
}

/// Loads configuration, installs logging and builds API clients.
pub struct CliRunner {
    config: ConfigFile,
    logging: LoggingGuard,
}

impl CliRunner {
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?.with_env_overrides()?;
        let logging = init_logging(&config.logging.directory, DEFAULT_LOG_FILE, verbose)?;
        Ok(Self { config, logging })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = ridedesk::VERSION,
            api = %self.config.api.base_url,
            log = %self.logging.path().display(),
            "RideDesk starting"
        );
    }

    pub fn api_client(&self) -> Result<Arc<dyn ApiClient>, CliError> {
        let client = ReqwestApiClient::new(self.config.api_config())?;
        Ok(Arc::new(client))
    }

    /// In-memory map engine shared by every view in this process.
    pub fn terminal_map(&self) -> TerminalMap {
        let engine = Arc::new(InMemoryEngine::new());
        let sessions = MapSessions::new(engine.clone(), self.config.map_config());
        let loader = MapLibraryLoader::install_global(engine.clone());
        TerminalMap {
            engine,
            sessions,
            loader,
        }
    }
}
