//! Typed names for every `section.key` in `config.ini`.
//!
//! [`ConfigKey`] is the single place that knows how a setting is rendered to
//! text and parsed back, so the file loader, `config get/set` and
//! `config list` all agree on the format.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::{ConfigError, ConfigResult};
use super::file::ConfigFile;
use crate::map::OSM_MAX_ZOOM;

/// Smallest accepted polling interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ApiBaseUrl,
    ApiToken,
    ApiTimeoutSecs,
    TrackingPollIntervalMs,
    TrackingLocationEvent,
    TrackingReconnectDelayMs,
    MapCenterLat,
    MapCenterLng,
    MapZoom,
    MapTileUrl,
    LoggingDirectory,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ApiBaseUrl,
            ConfigKey::ApiToken,
            ConfigKey::ApiTimeoutSecs,
            ConfigKey::TrackingPollIntervalMs,
            ConfigKey::TrackingLocationEvent,
            ConfigKey::TrackingReconnectDelayMs,
            ConfigKey::MapCenterLat,
            ConfigKey::MapCenterLng,
            ConfigKey::MapZoom,
            ConfigKey::MapTileUrl,
            ConfigKey::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl | ConfigKey::ApiToken | ConfigKey::ApiTimeoutSecs => "api",
            ConfigKey::TrackingPollIntervalMs
            | ConfigKey::TrackingLocationEvent
            | ConfigKey::TrackingReconnectDelayMs => "tracking",
            ConfigKey::MapCenterLat
            | ConfigKey::MapCenterLng
            | ConfigKey::MapZoom
            | ConfigKey::MapTileUrl => "map",
            ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl => "base_url",
            ConfigKey::ApiToken => "token",
            ConfigKey::ApiTimeoutSecs => "timeout_secs",
            ConfigKey::TrackingPollIntervalMs => "poll_interval_ms",
            ConfigKey::TrackingLocationEvent => "location_event",
            ConfigKey::TrackingReconnectDelayMs => "reconnect_delay_ms",
            ConfigKey::MapCenterLat => "center_lat",
            ConfigKey::MapCenterLng => "center_lng",
            ConfigKey::MapZoom => "zoom",
            ConfigKey::MapTileUrl => "tile_url",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full dotted name, e.g. `api.base_url`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Values that should not be echoed in listings.
    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigKey::ApiToken)
    }

    /// Current value as text; unset optional values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ApiBaseUrl => config.api.base_url.clone(),
            ConfigKey::ApiToken => config.api.token.clone().unwrap_or_default(),
            ConfigKey::ApiTimeoutSecs => config.api.timeout_secs.to_string(),
            ConfigKey::TrackingPollIntervalMs => config.tracking.poll_interval_ms.to_string(),
            ConfigKey::TrackingLocationEvent => config.tracking.location_event.clone(),
            ConfigKey::TrackingReconnectDelayMs => config.tracking.reconnect_delay_ms.to_string(),
            ConfigKey::MapCenterLat => config.map.center_lat.to_string(),
            ConfigKey::MapCenterLng => config.map.center_lng.to_string(),
            ConfigKey::MapZoom => config.map.zoom.to_string(),
            ConfigKey::MapTileUrl => config.map.tile_url.clone(),
            ConfigKey::LoggingDirectory => config.logging.directory.display().to_string(),
        }
    }

    /// Value for display, with secrets masked.
    pub fn display_value(&self, config: &ConfigFile) -> String {
        let value = self.get(config);
        if self.is_secret() && !value.is_empty() {
            "********".to_string()
        } else {
            value
        }
    }

    /// Parse `value` and store it in `config`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> ConfigResult<()> {
        let name = self.name();
        let trimmed = value.trim();

        match self {
            ConfigKey::ApiBaseUrl => {
                let url = reqwest::Url::parse(trimmed)
                    .map_err(|e| ConfigError::invalid(&name, value, e.to_string()))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::invalid(&name, value, "expected an http(s) URL"));
                }
                config.api.base_url = trimmed.trim_end_matches('/').to_string();
            }
            ConfigKey::ApiToken => {
                config.api.token = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            ConfigKey::ApiTimeoutSecs => {
                config.api.timeout_secs = parse_positive(&name, value)?;
            }
            ConfigKey::TrackingPollIntervalMs => {
                let ms = parse_positive(&name, value)?;
                if ms < MIN_POLL_INTERVAL_MS {
                    return Err(ConfigError::invalid(
                        &name,
                        value,
                        format!("must be at least {} ms", MIN_POLL_INTERVAL_MS),
                    ));
                }
                config.tracking.poll_interval_ms = ms;
            }
            ConfigKey::TrackingLocationEvent => {
                if trimmed.is_empty() {
                    return Err(ConfigError::invalid(&name, value, "event name is empty"));
                }
                config.tracking.location_event = trimmed.to_string();
            }
            ConfigKey::TrackingReconnectDelayMs => {
                config.tracking.reconnect_delay_ms = parse_positive(&name, value)?;
            }
            ConfigKey::MapCenterLat => {
                config.map.center_lat = parse_degrees(&name, value, 90.0)?;
            }
            ConfigKey::MapCenterLng => {
                config.map.center_lng = parse_degrees(&name, value, 180.0)?;
            }
            ConfigKey::MapZoom => {
                let zoom: u8 = trimmed
                    .parse()
                    .map_err(|_| ConfigError::invalid(&name, value, "expected a whole number"))?;
                if zoom > OSM_MAX_ZOOM {
                    return Err(ConfigError::invalid(
                        &name,
                        value,
                        format!("zoom must be at most {}", OSM_MAX_ZOOM),
                    ));
                }
                config.map.zoom = zoom;
            }
            ConfigKey::MapTileUrl => {
                if !(trimmed.contains("{z}") && trimmed.contains("{x}") && trimmed.contains("{y}")) {
                    return Err(ConfigError::invalid(
                        &name,
                        value,
                        "template needs {z}, {x} and {y} placeholders",
                    ));
                }
                config.map.tile_url = trimmed.to_string();
            }
            ConfigKey::LoggingDirectory => {
                if trimmed.is_empty() {
                    return Err(ConfigError::invalid(&name, value, "directory is empty"));
                }
                config.logging.directory = PathBuf::from(trimmed);
            }
        }
        Ok(())
    }
}

fn parse_positive(name: &str, value: &str) -> ConfigResult<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::invalid(name, value, "expected a positive whole number")),
    }
}

fn parse_degrees(name: &str, value: &str, limit: f64) -> ConfigResult<f64> {
    let degrees: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(name, value, "expected a number"))?;
    if !degrees.is_finite() || degrees.abs() > limit {
        return Err(ConfigError::invalid(
            name,
            value,
            format!("must be between -{} and {}", limit, limit),
        ));
    }
    Ok(degrees)
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}
