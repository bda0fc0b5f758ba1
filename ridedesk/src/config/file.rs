//! INI configuration file.
//!
//! ```ini
//! [api]
//! base_url = https://ops.example.com/api
//! token = ...
//! timeout_secs = 30
//!
//! [tracking]
//! poll_interval_ms = 15000
//! location_event = driver_location_update
//! reconnect_delay_ms = 5000
//!
//! [map]
//! center_lat = 24.7136
//! center_lng = 46.6753
//! zoom = 12
//! tile_url = https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png
//!
//! [logging]
//! directory = ~/.local/share/ridedesk/logs
//! ```
//!
//! A missing file yields defaults. Environment variables
//! ([`ENV_API_URL`], [`ENV_API_TOKEN`]) are applied on top by
//! [`ConfigFile::with_env_overrides`], never written back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::keys::ConfigKey;
use crate::api::{ApiConfig, DEFAULT_TIMEOUT_SECS};
use crate::demand::DemandConfig;
use crate::map::{LatLng, MapConfig, MapView, TileLayer, DEFAULT_CENTER, DEFAULT_ZOOM, OSM_TILE_URL};
use crate::tracking::{
    ChannelError, SocketIoConfig, TrackingConfig, DEFAULT_LOCATION_EVENT, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RECONNECT_DELAY,
};

/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "RIDEDESK_API_URL";

/// Overrides `api.token`.
pub const ENV_API_TOKEN: &str = "RIDEDESK_API_TOKEN";

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Directory holding `config.ini`.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ridedesk")
}

/// Full path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ridedesk")
        .join("logs")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSection {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSection {
    pub poll_interval_ms: u64,
    pub location_event: String,
    pub reconnect_delay_ms: u64,
}

impl Default for TrackingSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            location_event: DEFAULT_LOCATION_EVENT.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSection {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u8,
    pub tile_url: String,
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            center_lat: DEFAULT_CENTER.lat,
            center_lng: DEFAULT_CENTER.lng,
            zoom: DEFAULT_ZOOM,
            tile_url: OSM_TILE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSection {
    pub directory: PathBuf,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub api: ApiSection,
    pub tracking: TrackingSection,
    pub map: MapSection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(err) => ConfigError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save to the default location, creating the directory if needed.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Apply [`ENV_API_URL`] and [`ENV_API_TOKEN`] from the process environment.
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides using `lookup` in place of `std::env::var`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            debug!(var = ENV_API_URL, "Overriding API base URL from environment");
            ConfigKey::ApiBaseUrl.set(&mut self, &url)?;
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            debug!(var = ENV_API_TOKEN, "Overriding API token from environment");
            ConfigKey::ApiToken.set(&mut self, &token)?;
        }
        Ok(self)
    }

    pub fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::new(self.api.base_url.clone())
            .with_timeout(Duration::from_secs(self.api.timeout_secs));
        match &self.api.token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.tracking.poll_interval_ms)
    }

    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig::default().with_poll_interval(self.poll_interval())
    }

    pub fn demand_config(&self) -> DemandConfig {
        DemandConfig::default().with_poll_interval(Some(self.poll_interval()))
    }

    /// Socket.IO settings derived from the API base URL.
    pub fn socket_config(&self) -> Result<SocketIoConfig, ChannelError> {
        Ok(SocketIoConfig::from_api_base(&self.api.base_url)?
            .with_event(self.tracking.location_event.clone())
            .with_token(self.api.token.clone())
            .with_reconnect_delay(Duration::from_millis(self.tracking.reconnect_delay_ms)))
    }

    pub fn map_config(&self) -> MapConfig {
        let center = LatLng::checked(self.map.center_lat, self.map.center_lng)
            .unwrap_or(DEFAULT_CENTER);
        MapConfig {
            view: MapView {
                center,
                zoom: self.map.zoom,
            },
            tile_layer: TileLayer {
                url_template: self.map.tile_url.clone(),
                ..TileLayer::default()
            },
        }
    }
}
