//! Core map value types.

use std::fmt;

/// Default map centre (Riyadh).
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 24.7136,
    lng: 46.6753,
};

/// Default zoom level for a freshly created map.
pub const DEFAULT_ZOOM: u8 = 12;

/// OpenStreetMap tile URL template.
pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Attribution required by the OpenStreetMap tile usage policy.
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Maximum zoom served by the OSM tile servers.
pub const OSM_MAX_ZOOM: u8 = 19;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate only if it is finite and within range.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let candidate = Self { lat, lng };
        candidate.is_valid().then_some(candidate)
    }

    /// Build a coordinate from optional wire values.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        Self::checked(lat?, lng?)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Identifies the surface a map is rendered into (a DOM element id, a
/// terminal pane, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Engine-side identifier of a map instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineMapId(pub u64);

/// Engine-side identifier of a marker or shape layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// Centre and zoom of a map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// Raster tile layer definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
            max_zoom: OSM_MAX_ZOOM,
        }
    }
}

/// Marker palette shared by every map view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    Green,
    Orange,
    Red,
    Blue,
    Purple,
    Gray,
}

impl MarkerColor {
    pub fn hex(&self) -> &'static str {
        match self {
            MarkerColor::Green => "#22c55e",
            MarkerColor::Orange => "#f59e0b",
            MarkerColor::Red => "#ef4444",
            MarkerColor::Blue => "#3b82f6",
            MarkerColor::Purple => "#8b5cf6",
            MarkerColor::Gray => "#6b7280",
        }
    }
}

/// Visual style of a point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    pub color: MarkerColor,
    /// Single glyph used by text renderers and as the icon label.
    pub glyph: char,
    /// CSS class for HTML renderers.
    pub class_name: String,
}

impl MarkerIcon {
    pub fn new(color: MarkerColor, glyph: char, class_name: impl Into<String>) -> Self {
        Self {
            color,
            glyph,
            class_name: class_name.into(),
        }
    }
}

/// A point marker to place on a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub icon: MarkerIcon,
    /// Hover title.
    pub title: String,
    /// Popup HTML.
    pub popup: String,
}

/// A filled circle (used for demand zones).
#[derive(Debug, Clone, PartialEq)]
pub struct CircleSpec {
    pub center: LatLng,
    pub radius_m: f64,
    pub color: MarkerColor,
    pub fill_opacity: f32,
    pub popup: String,
}

/// Any layer the registry can place.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    Marker(MarkerSpec),
    Circle(CircleSpec),
}

impl LayerSpec {
    pub fn position(&self) -> LatLng {
        match self {
            LayerSpec::Marker(m) => m.position,
            LayerSpec::Circle(c) => c.center,
        }
    }

    pub fn color(&self) -> MarkerColor {
        match self {
            LayerSpec::Marker(m) => m.icon.color,
            LayerSpec::Circle(c) => c.color,
        }
    }
}
