//! In-memory mapping engine.
//!
//! Keeps every map and layer in memory. The terminal dashboard renders from
//! its [`MapSnapshot`]s, and the test suite uses its counters to check
//! lifecycle invariants (live maps per container, mutation counts).

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;

use super::engine::MapEngine;
use super::error::MapError;
use super::library::{MapAsset, MapAssetHost};
use super::types::{
    CircleSpec, ContainerId, EngineMapId, LatLng, LayerSpec, MapView, MarkerHandle, MarkerSpec,
    TileLayer,
};
use crate::api::BoxFuture;

/// Point-in-time copy of one map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub id: EngineMapId,
    pub container: ContainerId,
    pub view: MapView,
    pub tile_layer: Option<TileLayer>,
    pub layers: Vec<(MarkerHandle, LayerSpec)>,
}

impl MapSnapshot {
    pub fn markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.layers.iter().filter_map(|(_, layer)| match layer {
            LayerSpec::Marker(m) => Some(m),
            LayerSpec::Circle(_) => None,
        })
    }

    pub fn circles(&self) -> impl Iterator<Item = &CircleSpec> {
        self.layers.iter().filter_map(|(_, layer)| match layer {
            LayerSpec::Circle(c) => Some(c),
            LayerSpec::Marker(_) => None,
        })
    }
}

#[derive(Debug)]
struct MapState {
    container: ContainerId,
    view: MapView,
    tile_layer: Option<TileLayer>,
    layers: BTreeMap<MarkerHandle, LayerSpec>,
}

#[derive(Debug, Default)]
struct EngineState {
    next_id: u64,
    maps: BTreeMap<EngineMapId, MapState>,
    mutations: u64,
    maps_created: u64,
    maps_destroyed: u64,
    peak_per_container: HashMap<ContainerId, usize>,
    fail_next_create: bool,
    fail_next_tile_layer: bool,
    fail_next_script: bool,
    failing_titles: HashSet<String>,
    library_present: bool,
    stylesheets_injected: u32,
    scripts_loaded: u32,
}

impl EngineState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn map_mut(&mut self, map: EngineMapId) -> Result<&mut MapState, MapError> {
        self.maps.get_mut(&map).ok_or(MapError::UnknownMap(map))
    }

    fn live_in(&self, container: &ContainerId) -> usize {
        self.maps
            .values()
            .filter(|m| &m.container == container)
            .count()
    }
}

/// Mapping engine that keeps all state in memory.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose host already has the library loaded.
    pub fn with_library_present() -> Self {
        let engine = Self::default();
        engine.state.lock().library_present = true;
        engine
    }

    /// Make the next `create_map` call fail.
    pub fn fail_next_create(&self) {
        self.state.lock().fail_next_create = true;
    }

    /// Make the next `add_tile_layer` call fail.
    pub fn fail_next_tile_layer(&self) {
        self.state.lock().fail_next_tile_layer = true;
    }

    /// Make the next script load fail.
    pub fn fail_next_script_load(&self) {
        self.state.lock().fail_next_script = true;
    }

    /// Make every marker with this title fail to construct.
    pub fn fail_markers_titled(&self, title: impl Into<String>) {
        self.state.lock().failing_titles.insert(title.into());
    }

    /// Number of maps currently alive.
    pub fn live_map_count(&self) -> usize {
        self.state.lock().maps.len()
    }

    /// Ids of the maps alive in a container.
    pub fn live_maps_in(&self, container: &ContainerId) -> Vec<EngineMapId> {
        self.state
            .lock()
            .maps
            .iter()
            .filter(|(_, m)| &m.container == container)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Highest number of maps ever alive at once in a container.
    pub fn peak_live_maps_in(&self, container: &ContainerId) -> usize {
        self.state
            .lock()
            .peak_per_container
            .get(container)
            .copied()
            .unwrap_or(0)
    }

    pub fn maps_created(&self) -> u64 {
        self.state.lock().maps_created
    }

    pub fn maps_destroyed(&self) -> u64 {
        self.state.lock().maps_destroyed
    }

    /// Number of layer mutations (add, move, remove, set view) so far.
    pub fn mutation_count(&self) -> u64 {
        self.state.lock().mutations
    }

    /// Number of layers on a map (0 for unknown maps).
    pub fn layer_count(&self, map: EngineMapId) -> usize {
        self.state
            .lock()
            .maps
            .get(&map)
            .map(|m| m.layers.len())
            .unwrap_or(0)
    }

    /// Look up a single layer.
    pub fn layer(&self, map: EngineMapId, handle: MarkerHandle) -> Option<LayerSpec> {
        self.state
            .lock()
            .maps
            .get(&map)
            .and_then(|m| m.layers.get(&handle).cloned())
    }

    /// Copy of one map's state.
    pub fn snapshot(&self, map: EngineMapId) -> Option<MapSnapshot> {
        let state = self.state.lock();
        state.maps.get(&map).map(|m| MapSnapshot {
            id: map,
            container: m.container.clone(),
            view: m.view,
            tile_layer: m.tile_layer.clone(),
            layers: m.layers.iter().map(|(h, l)| (*h, l.clone())).collect(),
        })
    }

    pub fn stylesheets_injected(&self) -> u32 {
        self.state.lock().stylesheets_injected
    }

    pub fn scripts_loaded(&self) -> u32 {
        self.state.lock().scripts_loaded
    }

    fn add_layer(&self, map: EngineMapId, layer: LayerSpec) -> Result<MarkerHandle, MapError> {
        let mut state = self.state.lock();
        if let LayerSpec::Marker(marker) = &layer {
            if state.failing_titles.contains(&marker.title) {
                return Err(MapError::Engine(format!(
                    "marker '{}' could not be constructed",
                    marker.title
                )));
            }
        }
        // Check the map before allocating a handle.
        state.map_mut(map)?;
        let handle = MarkerHandle(state.next_id());
        state.map_mut(map)?.layers.insert(handle, layer);
        state.mutations += 1;
        Ok(handle)
    }
}

impl MapEngine for InMemoryEngine {
    fn create_map(&self, container: &ContainerId, view: &MapView) -> Result<EngineMapId, MapError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_create) {
            return Err(MapError::CreateFailed {
                container: container.clone(),
                reason: "container is not attached".to_string(),
            });
        }

        let id = EngineMapId(state.next_id());
        state.maps.insert(
            id,
            MapState {
                container: container.clone(),
                view: *view,
                tile_layer: None,
                layers: BTreeMap::new(),
            },
        );
        state.maps_created += 1;

        let live = state.live_in(container);
        let peak = state.peak_per_container.entry(container.clone()).or_insert(0);
        *peak = (*peak).max(live);

        Ok(id)
    }

    fn add_tile_layer(&self, map: EngineMapId, layer: &TileLayer) -> Result<(), MapError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_tile_layer) {
            return Err(MapError::Engine("tile layer rejected".to_string()));
        }
        state.map_mut(map)?.tile_layer = Some(layer.clone());
        Ok(())
    }

    fn destroy_map(&self, map: EngineMapId) {
        let mut state = self.state.lock();
        if state.maps.remove(&map).is_some() {
            state.maps_destroyed += 1;
        }
    }

    fn add_marker(&self, map: EngineMapId, marker: &MarkerSpec) -> Result<MarkerHandle, MapError> {
        self.add_layer(map, LayerSpec::Marker(marker.clone()))
    }

    fn add_circle(&self, map: EngineMapId, circle: &CircleSpec) -> Result<MarkerHandle, MapError> {
        self.add_layer(map, LayerSpec::Circle(circle.clone()))
    }

    fn move_marker(
        &self,
        map: EngineMapId,
        handle: MarkerHandle,
        position: LatLng,
    ) -> Result<(), MapError> {
        let mut state = self.state.lock();
        match state.map_mut(map)?.layers.get_mut(&handle) {
            Some(LayerSpec::Marker(marker)) => marker.position = position,
            Some(LayerSpec::Circle(circle)) => circle.center = position,
            None => return Err(MapError::UnknownMarker(handle)),
        }
        state.mutations += 1;
        Ok(())
    }

    fn remove_layer(&self, map: EngineMapId, handle: MarkerHandle) {
        let mut state = self.state.lock();
        let removed = state
            .maps
            .get_mut(&map)
            .map(|m| m.layers.remove(&handle).is_some())
            .unwrap_or(false);
        if removed {
            state.mutations += 1;
        }
    }

    fn set_view(&self, map: EngineMapId, view: &MapView) -> Result<(), MapError> {
        let mut state = self.state.lock();
        state.map_mut(map)?.view = *view;
        state.mutations += 1;
        Ok(())
    }
}

impl MapAssetHost for InMemoryEngine {
    fn library_present(&self) -> bool {
        self.state.lock().library_present
    }

    fn inject_stylesheet(&self, _asset: &MapAsset) {
        self.state.lock().stylesheets_injected += 1;
    }

    fn load_script(&self, _asset: &MapAsset) -> BoxFuture<'_, Result<(), MapError>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            if std::mem::take(&mut state.fail_next_script) {
                return Err(MapError::LibraryLoad("script failed to load".to_string()));
            }
            state.scripts_loaded += 1;
            state.library_present = true;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::types::{MarkerColor, MarkerIcon};

    fn marker(title: &str) -> MarkerSpec {
        MarkerSpec {
            position: LatLng::new(24.7, 46.6),
            icon: MarkerIcon::new(MarkerColor::Green, '●', "driver-online"),
            title: title.to_string(),
            popup: String::new(),
        }
    }

    #[test]
    fn test_create_and_destroy() {
        let engine = InMemoryEngine::new();
        let container = ContainerId::new("map");
        let id = engine.create_map(&container, &MapView::default()).unwrap();

        assert_eq!(engine.live_maps_in(&container), vec![id]);
        engine.destroy_map(id);
        engine.destroy_map(id);
        assert_eq!(engine.live_map_count(), 0);
        assert_eq!(engine.maps_destroyed(), 1);
    }

    #[test]
    fn test_marker_lifecycle_counts_mutations() {
        let engine = InMemoryEngine::new();
        let map = engine
            .create_map(&ContainerId::new("map"), &MapView::default())
            .unwrap();

        let handle = engine.add_marker(map, &marker("a")).unwrap();
        engine
            .move_marker(map, handle, LatLng::new(25.0, 47.0))
            .unwrap();
        engine.remove_layer(map, handle);
        engine.remove_layer(map, handle);

        assert_eq!(engine.mutation_count(), 3);
        assert_eq!(engine.layer_count(map), 0);
    }

    #[test]
    fn test_failing_title() {
        let engine = InMemoryEngine::new();
        let map = engine
            .create_map(&ContainerId::new("map"), &MapView::default())
            .unwrap();
        engine.fail_markers_titled("broken");

        assert!(engine.add_marker(map, &marker("broken")).is_err());
        assert!(engine.add_marker(map, &marker("fine")).is_ok());
    }

    #[test]
    fn test_layers_on_destroyed_map_fail() {
        let engine = InMemoryEngine::new();
        let map = engine
            .create_map(&ContainerId::new("map"), &MapView::default())
            .unwrap();
        engine.destroy_map(map);

        assert_eq!(
            engine.add_marker(map, &marker("late")),
            Err(MapError::UnknownMap(map))
        );
    }
}
