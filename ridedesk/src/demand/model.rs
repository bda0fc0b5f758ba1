//! Demand heatmap data.

use serde::Deserialize;
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::map::{popup_html, CircleSpec, LatLng, MarkerColor, MarkerIcon, Placeable};

/// Request count at or above which a zone is high intensity.
pub const HIGH_DEMAND_THRESHOLD: u64 = 20;

/// Request count at or above which a zone is medium intensity.
pub const MEDIUM_DEMAND_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn from_count(count: u64) -> Self {
        if count >= HIGH_DEMAND_THRESHOLD {
            Intensity::High
        } else if count >= MEDIUM_DEMAND_THRESHOLD {
            Intensity::Medium
        } else {
            Intensity::Low
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Intensity::Low),
            "medium" | "mid" | "moderate" => Some(Intensity::Medium),
            "high" => Some(Intensity::High),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Intensity::Low => "Low",
            Intensity::Medium => "Medium",
            Intensity::High => "High",
        }
    }

    pub fn color(&self) -> MarkerColor {
        match self {
            Intensity::Low => MarkerColor::Green,
            Intensity::Medium => MarkerColor::Orange,
            Intensity::High => MarkerColor::Red,
        }
    }

    /// Circle radius in metres.
    pub fn radius_m(&self) -> f64 {
        match self {
            Intensity::Low => 300.0,
            Intensity::Medium => 500.0,
            Intensity::High => 800.0,
        }
    }

    pub fn fill_opacity(&self) -> f32 {
        match self {
            Intensity::Low => 0.25,
            Intensity::Medium => 0.35,
            Intensity::High => 0.45,
        }
    }
}

/// One demand hotspot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct DemandZone {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub request_count: u64,
    intensity: Option<Intensity>,
    pub label: Option<String>,
}

impl TryFrom<Value> for DemandZone {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            latitude: row.opt_f64(&["latitude", "lat"]),
            longitude: row.opt_f64(&["longitude", "lng", "lon"]),
            request_count: row.count(&["request_count", "requests", "count", "total_requests"]),
            intensity: row.first(&["intensity", "level"], |v| {
                v.as_str().and_then(Intensity::parse)
            }),
            label: row.opt_string(&["label", "name", "area"]),
        })
    }
}

impl DemandZone {
    pub fn new(latitude: f64, longitude: f64, request_count: u64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            request_count,
            intensity: None,
            label: None,
        }
    }

    pub fn with_intensity(mut self, intensity: Intensity) -> Self {
        self.intensity = Some(intensity);
        self
    }

    /// Reported intensity, or one derived from the request count.
    pub fn intensity(&self) -> Intensity {
        self.intensity
            .unwrap_or_else(|| Intensity::from_count(self.request_count))
    }

    pub fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.latitude, self.longitude)
    }

    pub fn circle(&self, center: LatLng) -> CircleSpec {
        let intensity = self.intensity();
        let heading = self
            .label
            .clone()
            .unwrap_or_else(|| format!("{} demand", intensity.label()));
        CircleSpec {
            center,
            radius_m: intensity.radius_m(),
            color: intensity.color(),
            fill_opacity: intensity.fill_opacity(),
            popup: popup_html(
                &heading,
                &[
                    ("Requests", self.request_count.to_string()),
                    ("Intensity", intensity.label().to_string()),
                ],
            ),
        }
    }
}

/// A zone keyed by its position in the fetched list.
///
/// Zones carry no id, so the registry keys them by index.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexedZone<'a> {
    pub index: usize,
    pub zone: &'a DemandZone,
}

impl Placeable for IndexedZone<'_> {
    type Id = usize;

    fn marker_id(&self) -> usize {
        self.index
    }

    fn position(&self) -> Option<LatLng> {
        self.zone.position()
    }
}

/// A ride's pickup point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct RideMarker {
    pub ride_id: u64,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub status: String,
    pub address_text: String,
}

impl TryFrom<Value> for RideMarker {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            ride_id: row.id(&["ride_id", "rideId", "id"])?,
            pickup_lat: row.opt_f64(&["pickup_lat", "pickup_latitude", "start_latitude"]),
            pickup_lng: row.opt_f64(&["pickup_lng", "pickup_longitude", "start_longitude"]),
            status: row.string_or_empty(&["status"]),
            address_text: row.string_or_empty(&["address_text", "pickup_address", "start_address"]),
        })
    }
}

impl RideMarker {
    pub fn icon(&self) -> MarkerIcon {
        let color = match self.status.to_ascii_lowercase().as_str() {
            "pending" | "searching" | "new" => MarkerColor::Purple,
            "accepted" | "arrived" | "started" | "in_progress" => MarkerColor::Blue,
            "completed" => MarkerColor::Green,
            "cancelled" | "canceled" => MarkerColor::Red,
            _ => MarkerColor::Gray,
        };
        MarkerIcon::new(color, '●', "ride-marker")
    }

    pub fn popup(&self) -> String {
        let mut rows = vec![("Status", self.status.clone())];
        if !self.address_text.is_empty() {
            rows.push(("Pickup", self.address_text.clone()));
        }
        popup_html(&format!("Ride #{}", self.ride_id), &rows)
    }
}

impl Placeable for RideMarker {
    type Id = u64;

    fn marker_id(&self) -> u64 {
        self.ride_id
    }

    fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.pickup_lat, self.pickup_lng)
    }

    fn title(&self) -> String {
        format!("Ride #{}", self.ride_id)
    }
}

/// Time window the heatmap covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemandPeriod {
    LastHour,
    #[default]
    Today,
    Week,
    Month,
}

impl DemandPeriod {
    pub fn as_query(&self) -> &'static str {
        match self {
            DemandPeriod::LastHour => "hour",
            DemandPeriod::Today => "today",
            DemandPeriod::Week => "week",
            DemandPeriod::Month => "month",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hour" | "last_hour" => Some(DemandPeriod::LastHour),
            "today" | "day" => Some(DemandPeriod::Today),
            "week" => Some(DemandPeriod::Week),
            "month" => Some(DemandPeriod::Month),
            _ => None,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            DemandPeriod::LastHour => DemandPeriod::Today,
            DemandPeriod::Today => DemandPeriod::Week,
            DemandPeriod::Week => DemandPeriod::Month,
            DemandPeriod::Month => DemandPeriod::LastHour,
        }
    }
}

/// Aggregates over one demand snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemandSummary {
    pub zones: usize,
    pub total_requests: u64,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub rides: usize,
}

impl DemandSummary {
    pub fn compute(zones: &[DemandZone], rides: &[RideMarker]) -> Self {
        let mut summary = zones.iter().fold(Self::default(), |mut s, zone| {
            s.zones += 1;
            s.total_requests += zone.request_count;
            match zone.intensity() {
                Intensity::High => s.high += 1,
                Intensity::Medium => s.medium += 1,
                Intensity::Low => s.low += 1,
            }
            s
        });
        summary.rides = rides.len();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intensity_derived_from_count() {
        assert_eq!(Intensity::from_count(0), Intensity::Low);
        assert_eq!(Intensity::from_count(9), Intensity::Low);
        assert_eq!(Intensity::from_count(10), Intensity::Medium);
        assert_eq!(Intensity::from_count(19), Intensity::Medium);
        assert_eq!(Intensity::from_count(20), Intensity::High);
    }

    #[test]
    fn test_zone_prefers_reported_intensity() {
        let zone: DemandZone = serde_json::from_value(json!({
            "lat": "24.7", "lng": 46.6, "requests": "3", "intensity": "high"
        }))
        .unwrap();
        assert_eq!(zone.request_count, 3);
        assert_eq!(zone.intensity(), Intensity::High);

        let zone: DemandZone =
            serde_json::from_value(json!({"lat": 24.7, "lng": 46.6, "count": 12})).unwrap();
        assert_eq!(zone.intensity(), Intensity::Medium);
    }

    #[test]
    fn test_zone_circle_styling() {
        let zone = DemandZone::new(24.7, 46.6, 25);
        let circle = zone.circle(zone.position().unwrap());
        assert_eq!(circle.color, MarkerColor::Red);
        assert_eq!(circle.radius_m, 800.0);
        assert!(circle.popup.contains("High demand"));
    }

    #[test]
    fn test_ride_marker_decodes() {
        let ride: RideMarker = serde_json::from_value(json!({
            "id": 42, "pickup_latitude": 24.7, "pickup_longitude": 46.6,
            "status": "pending", "pickup_address": "Olaya St"
        }))
        .unwrap();
        assert_eq!(ride.ride_id, 42);
        assert!(ride.position().is_some());
        assert_eq!(ride.icon().color, MarkerColor::Purple);
        assert!(ride.popup().contains("Olaya St"));
    }

    #[test]
    fn test_overlapping_spellings_decode() {
        let zone: DemandZone = serde_json::from_value(json!({
            "latitude": "24.7", "lat": 24.9, "lng": 46.6, "lon": 46.6,
            "requests": null, "count": "14", "total_requests": 99,
            "intensity": null, "level": "high", "name": "Olaya", "area": "North"
        }))
        .unwrap();
        assert_eq!(zone.position(), Some(LatLng::new(24.7, 46.6)));
        assert_eq!(zone.request_count, 14);
        assert_eq!(zone.intensity(), Intensity::High);
        assert_eq!(zone.label.as_deref(), Some("Olaya"));

        let ride: RideMarker = serde_json::from_value(json!({
            "id": 900, "ride_id": "42", "rideId": 43,
            "pickup_latitude": 24.7, "start_latitude": 0, "pickup_longitude": "46.6",
            "status": "pending", "pickup_address": null, "start_address": "Olaya St"
        }))
        .unwrap();
        assert_eq!(ride.ride_id, 42);
        assert_eq!(ride.position(), Some(LatLng::new(24.7, 46.6)));
        assert_eq!(ride.address_text, "Olaya St");
    }

    #[test]
    fn test_summary() {
        let zones = vec![
            DemandZone::new(24.0, 46.0, 25),
            DemandZone::new(24.1, 46.1, 12),
            DemandZone::new(24.2, 46.2, 1),
        ];
        let summary = DemandSummary::compute(&zones, &[]);
        assert_eq!(summary.zones, 3);
        assert_eq!(summary.total_requests, 38);
        assert_eq!((summary.high, summary.medium, summary.low), (1, 1, 1));
    }
}
