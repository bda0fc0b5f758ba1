//! Mapping engine abstraction.
//!
//! `MapEngine` is the seam between the view-models and whatever actually
//! draws the map: a browser mapping library, a terminal canvas, or the
//! [`InMemoryEngine`](super::InMemoryEngine) used by tests.
//!
//! All methods are synchronous. Sessions call into the engine while holding
//! the session registry lock, which is what makes the stale-session guard
//! atomic with respect to teardown.

use super::error::MapError;
use super::types::{
    CircleSpec, ContainerId, EngineMapId, LatLng, MapView, MarkerHandle, MarkerSpec, TileLayer,
};

/// Operations a mapping engine must provide.
pub trait MapEngine: Send + Sync {
    /// Construct a map bound to `container`.
    fn create_map(&self, container: &ContainerId, view: &MapView) -> Result<EngineMapId, MapError>;

    /// Attach a raster tile layer.
    fn add_tile_layer(&self, map: EngineMapId, layer: &TileLayer) -> Result<(), MapError>;

    /// Tear down a map and everything on it. Unknown ids are ignored.
    fn destroy_map(&self, map: EngineMapId);

    /// Place a point marker.
    fn add_marker(&self, map: EngineMapId, marker: &MarkerSpec) -> Result<MarkerHandle, MapError>;

    /// Place a filled circle.
    fn add_circle(&self, map: EngineMapId, circle: &CircleSpec) -> Result<MarkerHandle, MapError>;

    /// Move an existing marker.
    fn move_marker(
        &self,
        map: EngineMapId,
        handle: MarkerHandle,
        position: LatLng,
    ) -> Result<(), MapError>;

    /// Remove a marker or circle. Unknown handles are ignored.
    fn remove_layer(&self, map: EngineMapId, handle: MarkerHandle);

    /// Recentre the viewport.
    fn set_view(&self, map: EngineMapId, view: &MapView) -> Result<(), MapError>;
}
