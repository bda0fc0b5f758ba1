//! Vehicle tracking data model.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::map::{popup_html, LatLng, MarkerColor, MarkerIcon, Placeable};

/// Driver presence as shown on the tracking map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnlineState {
    Online,
    Busy,
    #[default]
    Offline,
}

impl OnlineState {
    /// Parse the backend's various spellings.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" | "active" | "available" | "idle" => Some(OnlineState::Online),
            "busy" | "on_trip" | "on-trip" | "on_ride" | "in_ride" | "engaged" => {
                Some(OnlineState::Busy)
            }
            "offline" | "inactive" | "away" => Some(OnlineState::Offline),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OnlineState::Online => "Online",
            OnlineState::Busy => "Busy",
            OnlineState::Offline => "Offline",
        }
    }

    pub fn color(&self) -> MarkerColor {
        match self {
            OnlineState::Online => MarkerColor::Green,
            OnlineState::Busy => MarkerColor::Orange,
            OnlineState::Offline => MarkerColor::Gray,
        }
    }
}

/// One driver's last known position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct VehiclePosition {
    pub id: u64,
    pub display_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub online_state: OnlineState,
    pub available: bool,
    pub vehicle_label: Option<String>,
    pub phone: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

// Location rows carry the driver under `driver_id`; a bare `id` may be the
// row id and is only a fallback.
const DRIVER_ID: &[&str] = &["driver_id", "driverId", "id"];
const DISPLAY_NAME: &[&str] = &["display_name", "name", "driver_name", "full_name", "displayName"];
const LATITUDE: &[&str] = &["latitude", "lat"];
const LONGITUDE: &[&str] = &["longitude", "lng", "lon"];
const STATE: &[&str] = &["online_state", "status", "online_status"];
const AVAILABLE: &[&str] = &["available", "is_available", "availability"];

fn online_state(value: &Value) -> Option<OnlineState> {
    value.as_str().and_then(OnlineState::parse)
}

impl TryFrom<Value> for VehiclePosition {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(DRIVER_ID)?,
            display_name: row.string_or_empty(DISPLAY_NAME),
            latitude: row.opt_f64(LATITUDE),
            longitude: row.opt_f64(LONGITUDE),
            online_state: row.first(STATE, online_state).unwrap_or_default(),
            available: row.flag(AVAILABLE),
            vehicle_label: row.opt_string(&["vehicle_label", "vehicle", "plate_number"]),
            phone: row.opt_string(&["phone", "mobile"]),
            last_update: None,
        })
    }
}

impl VehiclePosition {
    /// Placeholder entry for a driver first seen on the live channel.
    pub fn synthesized(update: &LocationUpdate) -> Self {
        Self {
            id: update.driver_id,
            display_name: update
                .display_name
                .clone()
                .unwrap_or_else(|| format!("Driver #{}", update.driver_id)),
            latitude: Some(update.position.lat),
            longitude: Some(update.position.lng),
            online_state: update.state.unwrap_or(OnlineState::Online),
            available: update.available.unwrap_or(true),
            vehicle_label: None,
            phone: None,
            last_update: Some(Utc::now()),
        }
    }

    /// Apply a live update in place.
    pub fn apply(&mut self, update: &LocationUpdate) {
        self.latitude = Some(update.position.lat);
        self.longitude = Some(update.position.lng);
        if let Some(name) = &update.display_name {
            self.display_name = name.clone();
        }
        if let Some(state) = update.state {
            self.online_state = state;
        }
        if let Some(available) = update.available {
            self.available = available;
        }
        self.last_update = Some(Utc::now());
    }

    pub fn icon(&self) -> MarkerIcon {
        let class = match self.online_state {
            OnlineState::Online => "driver-marker driver-online",
            OnlineState::Busy => "driver-marker driver-busy",
            OnlineState::Offline => "driver-marker driver-offline",
        };
        MarkerIcon::new(self.online_state.color(), '▲', class)
    }

    pub fn popup(&self) -> String {
        let mut rows = vec![
            ("Status", self.online_state.label().to_string()),
            (
                "Available",
                if self.available { "Yes" } else { "No" }.to_string(),
            ),
        ];
        if let Some(vehicle) = &self.vehicle_label {
            rows.push(("Vehicle", vehicle.clone()));
        }
        if let Some(phone) = &self.phone {
            rows.push(("Phone", phone.clone()));
        }
        if let Some(position) = self.position() {
            rows.push(("Location", position.to_string()));
        }
        popup_html(&self.display_name, &rows)
    }
}

impl Placeable for VehiclePosition {
    type Id = u64;

    fn marker_id(&self) -> u64 {
        self.id
    }

    fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.latitude, self.longitude)
    }

    fn title(&self) -> String {
        self.display_name.clone()
    }
}

/// A position event from the live channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub driver_id: u64,
    pub position: LatLng,
    pub display_name: Option<String>,
    pub state: Option<OnlineState>,
    pub available: Option<bool>,
}

impl LocationUpdate {
    /// Parse an event payload. Returns `None` when the id or coordinates are
    /// missing or invalid.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let row = Row::new(payload).ok()?;

        let driver_id = row.opt_id(&["driverId", "driver_id", "id"])?;
        let lat = row.opt_f64(LATITUDE)?;
        let lng = row.opt_f64(LONGITUDE)?;
        let position = LatLng::checked(lat, lng)?;

        Some(Self {
            driver_id,
            position,
            display_name: row.first(&["name", "driver_name", "displayName"], |v| {
                v.as_str().map(String::from)
            }),
            state: row.first(&["status", "online_status"], online_state),
            available: row.opt_flag(AVAILABLE),
        })
    }
}

/// Which vehicles the map shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleFilter {
    #[default]
    All,
    Online,
    Busy,
    Offline,
    Available,
}

impl VehicleFilter {
    pub fn matches(&self, vehicle: &VehiclePosition) -> bool {
        match self {
            VehicleFilter::All => true,
            VehicleFilter::Online => vehicle.online_state == OnlineState::Online,
            VehicleFilter::Busy => vehicle.online_state == OnlineState::Busy,
            VehicleFilter::Offline => vehicle.online_state == OnlineState::Offline,
            VehicleFilter::Available => vehicle.available,
        }
    }

    /// Next filter in display order, for cycling in the UI.
    pub fn next(&self) -> Self {
        match self {
            VehicleFilter::All => VehicleFilter::Online,
            VehicleFilter::Online => VehicleFilter::Busy,
            VehicleFilter::Busy => VehicleFilter::Offline,
            VehicleFilter::Offline => VehicleFilter::Available,
            VehicleFilter::Available => VehicleFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VehicleFilter::All => "All",
            VehicleFilter::Online => "Online",
            VehicleFilter::Busy => "Busy",
            VehicleFilter::Offline => "Offline",
            VehicleFilter::Available => "Available",
        }
    }
}

/// Fleet counters for the status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetStats {
    pub total: usize,
    pub online: usize,
    pub busy: usize,
    pub offline: usize,
    pub available: usize,
    /// Vehicles without valid coordinates.
    pub unplaced: usize,
}

impl FleetStats {
    pub fn from_vehicles(vehicles: &[VehiclePosition]) -> Self {
        vehicles.iter().fold(Self::default(), |mut stats, v| {
            stats.total += 1;
            match v.online_state {
                OnlineState::Online => stats.online += 1,
                OnlineState::Busy => stats.busy += 1,
                OnlineState::Offline => stats.offline += 1,
            }
            if v.available {
                stats.available += 1;
            }
            if v.position().is_none() {
                stats.unplaced += 1;
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vehicle_decodes_backend_shape() {
        let v: VehiclePosition = serde_json::from_value(json!({
            "id": "5",
            "name": "Ahmed",
            "latitude": "24.71",
            "longitude": 46.68,
            "status": "busy",
            "is_available": 0,
            "plate_number": "ABC 123"
        }))
        .unwrap();

        assert_eq!(v.id, 5);
        assert_eq!(v.display_name, "Ahmed");
        assert_eq!(v.position(), Some(LatLng::new(24.71, 46.68)));
        assert_eq!(v.online_state, OnlineState::Busy);
        assert!(!v.available);
        assert_eq!(v.vehicle_label.as_deref(), Some("ABC 123"));
    }

    #[test]
    fn test_vehicle_with_bad_coordinates_decodes_unplaced() {
        let v: VehiclePosition =
            serde_json::from_value(json!({"id": 1, "lat": "", "lng": null})).unwrap();
        assert_eq!(v.position(), None);
        assert_eq!(v.online_state, OnlineState::Offline);
    }

    #[test]
    fn test_location_update_from_payload() {
        let update =
            LocationUpdate::from_payload(&json!({"driverId": 5, "lat": 24.71, "lng": 46.68}))
                .unwrap();
        assert_eq!(update.driver_id, 5);
        assert_eq!(update.position, LatLng::new(24.71, 46.68));
        assert_eq!(update.state, None);

        let update = LocationUpdate::from_payload(&json!({
            "driver_id": "9", "latitude": "24.1", "longitude": "46.2",
            "status": "online", "is_available": true, "name": "Sara"
        }))
        .unwrap();
        assert_eq!(update.driver_id, 9);
        assert_eq!(update.state, Some(OnlineState::Online));
        assert_eq!(update.available, Some(true));
        assert_eq!(update.display_name.as_deref(), Some("Sara"));
    }

    #[test]
    fn test_vehicle_with_overlapping_spellings_decodes() {
        let v: VehiclePosition = serde_json::from_value(json!({
            "id": 11, "driver_id": 5,
            "name": null, "full_name": "Sara Q",
            "latitude": "24.7", "lat": 24.9,
            "lng": 46.6, "longitude": 46.6,
            "status": null, "online_status": "busy",
            "is_available": 1, "availability": "no"
        }))
        .unwrap();

        assert_eq!(v.id, 5);
        assert_eq!(v.display_name, "Sara Q");
        assert_eq!(v.position(), Some(LatLng::new(24.7, 46.6)));
        assert_eq!(v.online_state, OnlineState::Busy);
        assert!(v.available);
    }

    #[test]
    fn test_vehicle_without_any_id_is_rejected() {
        let result: Result<VehiclePosition, _> =
            serde_json::from_value(json!({"driver_id": null, "name": "Ghost", "lat": 24.7}));
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_id_falls_through_null_and_garbage() {
        let update = LocationUpdate::from_payload(&json!({
            "driverId": null, "driver_id": "n/a", "id": 5, "lat": 24.7, "lng": 46.6
        }))
        .unwrap();
        assert_eq!(update.driver_id, 5);

        let update = LocationUpdate::from_payload(&json!({
            "driverId": 7, "lat": null, "latitude": "24.7", "lng": 46.6
        }))
        .unwrap();
        assert_eq!(update.position, LatLng::new(24.7, 46.6));
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        assert!(LocationUpdate::from_payload(&json!({"lat": 24.7, "lng": 46.6})).is_none());
        assert!(LocationUpdate::from_payload(&json!({"driverId": 5, "lat": 24.7})).is_none());
        assert!(
            LocationUpdate::from_payload(&json!({"driverId": 5, "lat": 124.7, "lng": 46.6}))
                .is_none()
        );
        assert!(LocationUpdate::from_payload(&json!("not an object")).is_none());
    }

    #[test]
    fn test_synthesized_entry_uses_placeholder_name() {
        let update =
            LocationUpdate::from_payload(&json!({"driverId": 5, "lat": 24.71, "lng": 46.68}))
                .unwrap();
        let v = VehiclePosition::synthesized(&update);
        assert_eq!(v.display_name, "Driver #5");
        assert_eq!(v.online_state, OnlineState::Online);
        assert!(v.available);
        assert!(v.last_update.is_some());
    }

    #[test]
    fn test_apply_keeps_unspecified_fields() {
        let mut v: VehiclePosition = serde_json::from_value(json!({
            "id": 1, "name": "Omar", "lat": 24.0, "lng": 46.0, "status": "busy"
        }))
        .unwrap();
        let update =
            LocationUpdate::from_payload(&json!({"driverId": 1, "lat": 24.5, "lng": 46.5}))
                .unwrap();

        v.apply(&update);

        assert_eq!(v.display_name, "Omar");
        assert_eq!(v.online_state, OnlineState::Busy);
        assert_eq!(v.position(), Some(LatLng::new(24.5, 46.5)));
    }

    #[test]
    fn test_fleet_stats() {
        let vehicles: Vec<VehiclePosition> = serde_json::from_value(json!([
            {"id": 1, "lat": 24.0, "lng": 46.0, "status": "online", "is_available": 1},
            {"id": 2, "lat": 24.0, "lng": 46.0, "status": "busy"},
            {"id": 3, "status": "offline"}
        ]))
        .unwrap();

        let stats = FleetStats::from_vehicles(&vehicles);
        assert_eq!(stats.total, 3);
        assert_eq!((stats.online, stats.busy, stats.offline), (1, 1, 1));
        assert_eq!(stats.available, 1);
        assert_eq!(stats.unplaced, 1);
    }

    #[test]
    fn test_filter_cycle_returns_to_all() {
        let mut filter = VehicleFilter::All;
        for _ in 0..5 {
            filter = filter.next();
        }
        assert_eq!(filter, VehicleFilter::All);
    }
}
