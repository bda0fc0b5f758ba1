//! Map sessions: one live engine map per container.
//!
//! # Invariants
//!
//! - At most one active session per container. Creating a session tears the
//!   previous one down before the new map is constructed.
//! - A session handle is an explicit value owned by the view and passed to
//!   every function that touches the map. Nothing is stashed on the rendering
//!   surface.
//! - [`MapSession::with_active`] runs engine calls under the registry lock,
//!   and only if the session is still the active one for its container. This
//!   is the stale-session guard: a fetch that started against session S1 and
//!   completes after S2 replaced it mutates nothing.
//!
//! ```text
//! create_session(c) ──► destroy(previous in c) ──► create_map ──► tile layer
//!                                                        │
//!                        MapSession { generation, map } ◄┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::engine::MapEngine;
use super::error::MapError;
use super::types::{ContainerId, EngineMapId, MapView, TileLayer};

/// Map construction settings shared by every session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapConfig {
    pub view: MapView,
    pub tile_layer: TileLayer,
}

/// Monotonic identity of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy)]
struct ActiveEntry {
    session: SessionId,
    map: EngineMapId,
}

/// Registry of active map sessions, keyed by container.
pub struct MapSessions {
    engine: Arc<dyn MapEngine>,
    config: MapConfig,
    next_session: AtomicU64,
    active: Mutex<HashMap<ContainerId, ActiveEntry>>,
}

impl MapSessions {
    pub fn new(engine: Arc<dyn MapEngine>, config: MapConfig) -> Arc<Self> {
        Arc::new(Self {
            engine,
            config,
            next_session: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Create a session in `container`, replacing any existing one.
    ///
    /// The previous session's map is destroyed before the new map is built,
    /// so two maps never coexist in one container. On failure the container
    /// is left without a session.
    pub fn create_session(self: &Arc<Self>, container: &ContainerId) -> Result<MapSession, MapError> {
        let mut active = self.active.lock();

        if let Some(previous) = active.remove(container) {
            info!(
                container = %container,
                session = previous.session.0,
                "Tearing down previous map session"
            );
            self.engine.destroy_map(previous.map);
        }

        let map = self.engine.create_map(container, &self.config.view)?;
        if let Err(e) = self.engine.add_tile_layer(map, &self.config.tile_layer) {
            warn!(container = %container, error = %e, "Tile layer failed, discarding map");
            self.engine.destroy_map(map);
            return Err(e);
        }

        let session = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        active.insert(container.clone(), ActiveEntry { session, map });

        info!(container = %container, session = session.0, "Map session created");

        Ok(MapSession {
            inner: Arc::new(SessionInner {
                id: session,
                map,
                container: container.clone(),
                registry: Arc::clone(self),
            }),
        })
    }

    /// The active session id for a container.
    pub fn active_session(&self, container: &ContainerId) -> Option<SessionId> {
        self.active.lock().get(container).map(|e| e.session)
    }

    /// Number of containers with an active session.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    fn is_active(&self, container: &ContainerId, session: SessionId) -> bool {
        self.active
            .lock()
            .get(container)
            .is_some_and(|e| e.session == session)
    }

    fn with_active<R>(
        &self,
        container: &ContainerId,
        session: SessionId,
        f: impl FnOnce(&dyn MapEngine, EngineMapId) -> R,
    ) -> Option<R> {
        let active = self.active.lock();
        match active.get(container) {
            Some(entry) if entry.session == session => Some(f(self.engine.as_ref(), entry.map)),
            _ => {
                debug!(container = %container, session = session.0, "Skipping stale session");
                None
            }
        }
    }

    fn destroy(&self, container: &ContainerId, session: SessionId) -> bool {
        let mut active = self.active.lock();
        match active.get(container) {
            Some(entry) if entry.session == session => {
                let map = entry.map;
                active.remove(container);
                self.engine.destroy_map(map);
                info!(container = %container, session = session.0, "Map session destroyed");
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for MapSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSessions")
            .field("config", &self.config)
            .field("active", &self.active.lock().len())
            .finish_non_exhaustive()
    }
}

struct SessionInner {
    id: SessionId,
    map: EngineMapId,
    container: ContainerId,
    registry: Arc<MapSessions>,
}

/// Handle to one map instance bound to a container.
///
/// Cheap to clone. Cloning does not extend the map's life: the map lives
/// until [`destroy`](Self::destroy) or until a newer session replaces it.
#[derive(Clone)]
pub struct MapSession {
    inner: Arc<SessionInner>,
}

impl MapSession {
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn map_id(&self) -> EngineMapId {
        self.inner.map
    }

    pub fn container(&self) -> &ContainerId {
        &self.inner.container
    }

    /// Whether this session is still the active one for its container.
    pub fn is_active(&self) -> bool {
        self.inner
            .registry
            .is_active(&self.inner.container, self.inner.id)
    }

    /// Run `f` against the engine if, and only if, this session is active.
    ///
    /// Returns `None` for a stale session. The check and the engine calls
    /// happen under one lock, so teardown cannot interleave.
    pub fn with_active<R>(&self, f: impl FnOnce(&dyn MapEngine, EngineMapId) -> R) -> Option<R> {
        self.inner
            .registry
            .with_active(&self.inner.container, self.inner.id, f)
    }

    /// Tear down the map if this session is still active. Idempotent.
    ///
    /// Returns `true` if this call destroyed the map.
    pub fn destroy(&self) -> bool {
        self.inner
            .registry
            .destroy(&self.inner.container, self.inner.id)
    }
}

impl PartialEq for MapSession {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MapSession {}

impl std::fmt::Debug for MapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSession")
            .field("id", &self.inner.id)
            .field("map", &self.inner.map)
            .field("container", &self.inner.container)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::memory::InMemoryEngine;
    use crate::map::types::LatLng;

    fn setup() -> (Arc<InMemoryEngine>, Arc<MapSessions>) {
        let engine = Arc::new(InMemoryEngine::new());
        let sessions = MapSessions::new(engine.clone(), MapConfig::default());
        (engine, sessions)
    }

    #[test]
    fn test_default_config_uses_view_and_tile_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.view, MapView::default());
        assert_eq!(config.tile_layer, TileLayer::default());
        assert!(config.tile_layer.url_template.contains("{z}"));
    }

    #[test]
    fn test_new_session_replaces_previous() {
        let (engine, sessions) = setup();
        let container = ContainerId::new("tracking-map");

        let first = sessions.create_session(&container).unwrap();
        let second = sessions.create_session(&container).unwrap();

        assert!(!first.is_active());
        assert!(second.is_active());
        assert_eq!(engine.live_maps_in(&container), vec![second.map_id()]);
        assert_eq!(engine.peak_live_maps_in(&container), 1);
    }

    #[test]
    fn test_many_creates_never_overlap() {
        let (engine, sessions) = setup();
        let container = ContainerId::new("tracking-map");

        for _ in 0..10 {
            sessions.create_session(&container).unwrap();
            assert_eq!(engine.live_maps_in(&container).len(), 1);
        }
        assert_eq!(engine.peak_live_maps_in(&container), 1);
        assert_eq!(engine.maps_created(), 10);
        assert_eq!(engine.maps_destroyed(), 9);
    }

    #[test]
    fn test_containers_are_independent() {
        let (engine, sessions) = setup();
        let a = sessions.create_session(&ContainerId::new("a")).unwrap();
        let b = sessions.create_session(&ContainerId::new("b")).unwrap();

        assert!(a.is_active() && b.is_active());
        assert_eq!(engine.live_map_count(), 2);
        assert_eq!(sessions.active_count(), 2);
    }

    #[test]
    fn test_stale_session_cannot_mutate() {
        let (engine, sessions) = setup();
        let container = ContainerId::new("tracking-map");
        let stale = sessions.create_session(&container).unwrap();
        let _fresh = sessions.create_session(&container).unwrap();
        let before = engine.mutation_count();

        let result = stale.with_active(|engine, map| {
            engine.set_view(
                map,
                &MapView {
                    center: LatLng::new(0.0, 0.0),
                    zoom: 3,
                },
            )
        });

        assert!(result.is_none());
        assert_eq!(engine.mutation_count(), before);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (engine, sessions) = setup();
        let container = ContainerId::new("tracking-map");
        let session = sessions.create_session(&container).unwrap();

        assert!(session.destroy());
        assert!(!session.destroy());
        assert!(!session.is_active());
        assert_eq!(engine.live_map_count(), 0);
        assert_eq!(sessions.active_session(&container), None);
    }

    #[test]
    fn test_destroying_stale_session_keeps_replacement() {
        let (engine, sessions) = setup();
        let container = ContainerId::new("tracking-map");
        let stale = sessions.create_session(&container).unwrap();
        let fresh = sessions.create_session(&container).unwrap();

        assert!(!stale.destroy());
        assert!(fresh.is_active());
        assert_eq!(engine.live_map_count(), 1);
    }

    #[test]
    fn test_create_failure_leaves_no_session() {
        let (engine, sessions) = setup();
        let container = ContainerId::new("tracking-map");
        let old = sessions.create_session(&container).unwrap();

        engine.fail_next_create();
        assert!(sessions.create_session(&container).is_err());

        assert!(!old.is_active());
        assert_eq!(engine.live_map_count(), 0);
        assert_eq!(sessions.active_session(&container), None);
    }

    #[test]
    fn test_tile_layer_failure_discards_map() {
        let (engine, sessions) = setup();
        engine.fail_next_tile_layer();

        let result = sessions.create_session(&ContainerId::new("tracking-map"));
        assert!(result.is_err());
        assert_eq!(engine.live_map_count(), 0);
    }
}
