//! Vehicle tracking view-model.
//!
//! # Lifecycle
//!
//! ```text
//! mount ──► ensure_loaded ──► attach session ──► open channel ──► start poller
//!                                                     │               │
//!                                  Position events ◄──┘               │
//!                                        │                            ▼
//!                                  merge_location              fetch_and_redraw
//!                                  (move marker only)          (replace markers)
//!
//! unmount ──► cancel token ──► stop poller ──► close channel ──► clear markers
//!                                                               ──► destroy session
//! ```
//!
//! All state lives behind one `parking_lot::Mutex` that is never held across
//! an `.await`. A fetch captures the session id when it starts and discards
//! its result if the view was unmounted or the map rebuilt in the meantime.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::channel::{ChannelEvent, ConnectionState, LiveLocationChannel};
use super::model::{FleetStats, LocationUpdate, VehicleFilter, VehiclePosition};
use super::poller::{refresh_fn, Poller, DEFAULT_POLL_INTERVAL_MS};
use crate::api::{fetch_list, ApiClient, ApiRequest};
use crate::crud::{Notice, NoticeBoard};
use crate::map::{
    ContainerId, MapBinding, MapError, MapLibraryLoader, MapSessions, MapView, MarkerRegistry,
    Placeable, SessionId,
};

/// Endpoint returning every driver's last known position.
pub const DRIVER_LOCATIONS_PATH: &str = "/admin/drivers/locations";

/// Zoom used when focusing a single vehicle.
pub const FOCUS_ZOOM: u8 = 16;

/// Settings for a [`TrackingView`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    pub container: ContainerId,
    pub locations_path: String,
    pub poll_interval: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            container: ContainerId::new("tracking-map"),
            locations_path: DRIVER_LOCATIONS_PATH.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl TrackingConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_container(mut self, container: ContainerId) -> Self {
        self.container = container;
        self
    }
}

/// What a live position event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A known vehicle was updated and its marker moved.
    Moved,
    /// A known vehicle was updated but has no marker (filtered out or unplaced).
    Updated,
    /// An unknown vehicle was added; its marker appears on the next redraw.
    Synthesized,
    /// The view is not mounted.
    Ignored,
}

/// Read-only copy of the view state for rendering.
#[derive(Debug, Clone)]
pub struct TrackingSnapshot {
    pub vehicles: Vec<VehiclePosition>,
    pub filter: VehicleFilter,
    pub connection: ConnectionState,
    pub stats: FleetStats,
    pub markers: usize,
    pub session: Option<SessionId>,
    pub loading: bool,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct TrackingState {
    binding: MapBinding,
    markers: MarkerRegistry<u64>,
    vehicles: Vec<VehiclePosition>,
    filter: VehicleFilter,
    connection: ConnectionState,
    notices: NoticeBoard,
    mounted: bool,
    unmounted: bool,
    loading: bool,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl TrackingState {
    /// Replace every marker with the vehicles passing the filter.
    fn redraw(&mut self) {
        let Some(session) = self.binding.session().cloned() else {
            return;
        };
        let filter = self.filter;
        let visible: Vec<VehiclePosition> = self
            .vehicles
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        let outcome = self.markers.replace_all(
            &session,
            &visible,
            VehiclePosition::icon,
            VehiclePosition::popup,
        );
        debug!(
            placed = outcome.placed,
            skipped = outcome.skipped,
            failed = outcome.failed,
            stale = outcome.stale,
            "Tracking markers redrawn"
        );
    }

    fn teardown(&mut self) {
        if let Some(session) = self.binding.session().cloned() {
            self.markers.clear(&session);
        }
        self.markers.forget();
        self.binding.detach();
    }
}

struct Inner {
    api: Arc<dyn ApiClient>,
    loader: Arc<MapLibraryLoader>,
    channel: Arc<dyn LiveLocationChannel>,
    config: TrackingConfig,
    poller: Poller,
    shutdown: CancellationToken,
    state: Mutex<TrackingState>,
}

impl Inner {
    async fn fetch_and_redraw(&self) {
        let captured = {
            let mut state = self.state.lock();
            if state.unmounted {
                return;
            }
            state.loading = true;
            state.binding.current_id()
        };

        let request = ApiRequest::get(self.config.locations_path.clone());
        let result = fetch_list::<VehiclePosition>(self.api.as_ref(), request).await;

        let mut state = self.state.lock();
        state.loading = false;
        if state.unmounted || !state.binding.is_current(captured) {
            debug!("Discarding vehicle fetch for a replaced or unmounted map");
            return;
        }

        match result {
            Ok(mut vehicles) => {
                let now = Utc::now();
                for vehicle in &mut vehicles {
                    vehicle.last_update = Some(now);
                }
                debug!(count = vehicles.len(), "Vehicle positions refreshed");
                state.vehicles = vehicles;
                state.last_refresh = Some(now);
                state.last_error = None;
                state.redraw();
            }
            Err(e) => {
                warn!(error = %e, "Vehicle refresh failed");
                state.last_error = Some(e.to_string());
                state.notices.error(e.user_message());
            }
        }
    }

    fn merge_location(&self, update: &LocationUpdate) -> MergeOutcome {
        let mut state = self.state.lock();
        if state.unmounted || !state.mounted {
            return MergeOutcome::Ignored;
        }

        let known = match state.vehicles.iter().position(|v| v.id == update.driver_id) {
            Some(index) => {
                state.vehicles[index].apply(update);
                true
            }
            None => {
                debug!(driver = update.driver_id, "Live update for unknown driver");
                state.vehicles.push(VehiclePosition::synthesized(update));
                false
            }
        };

        let moved = match state.binding.session() {
            Some(session) => state
                .markers
                .update_one(session, &update.driver_id, update.position),
            None => false,
        };

        match (known, moved) {
            (false, _) => MergeOutcome::Synthesized,
            (true, true) => MergeOutcome::Moved,
            (true, false) => MergeOutcome::Updated,
        }
    }

    fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.state.lock().connection = ConnectionState::Connected;
            }
            ChannelEvent::Disconnected { reason } => {
                debug!(reason = %reason, "Tracking channel disconnected");
                let mut state = self.state.lock();
                if state.connection != ConnectionState::Closed {
                    state.connection = ConnectionState::Disconnected;
                }
            }
            ChannelEvent::Position(update) => {
                self.merge_location(&update);
            }
        }
    }

    /// Build a new map session and redraw the current vehicles on it.
    async fn rebuild_map(&self) -> Result<SessionId, MapError> {
        if let Err(e) = self.loader.ensure_loaded().await {
            self.state
                .lock()
                .notices
                .error("The map could not be loaded. Try refreshing.");
            return Err(e);
        }

        let mut state = self.state.lock();
        if state.unmounted {
            return Err(MapError::Engine("view is unmounted".to_string()));
        }
        // The old map is destroyed by attach, so its handles are just forgotten.
        state.markers.forget();
        match state.binding.attach() {
            Ok(session) => {
                state.redraw();
                Ok(session.id())
            }
            Err(e) => {
                warn!(error = %e, "Failed to create tracking map");
                state.notices.error("The map could not be created.");
                Err(e)
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.channel.close();
        self.state.get_mut().teardown();
    }
}

/// Live vehicle map: REST polling merged with a push channel.
#[derive(Clone)]
pub struct TrackingView {
    inner: Arc<Inner>,
}

impl TrackingView {
    pub fn new(
        api: Arc<dyn ApiClient>,
        sessions: Arc<MapSessions>,
        loader: Arc<MapLibraryLoader>,
        channel: Arc<dyn LiveLocationChannel>,
        config: TrackingConfig,
    ) -> Self {
        let binding = MapBinding::new(config.container.clone(), sessions);
        Self {
            inner: Arc::new(Inner {
                api,
                loader,
                channel,
                config,
                poller: Poller::new(),
                shutdown: CancellationToken::new(),
                state: Mutex::new(TrackingState {
                    binding,
                    markers: MarkerRegistry::new(),
                    vehicles: Vec::new(),
                    filter: VehicleFilter::All,
                    connection: ConnectionState::Connecting,
                    notices: NoticeBoard::new(),
                    mounted: false,
                    unmounted: false,
                    loading: false,
                    last_refresh: None,
                    last_error: None,
                }),
            }),
        }
    }

    /// Load the map, subscribe to live updates and start polling.
    ///
    /// A map that fails to load leaves the view mounted without a session;
    /// [`refresh_now`](Self::refresh_now) retries it. Mounting twice, or
    /// after unmount, does nothing.
    pub async fn mount(&self) -> Result<(), MapError> {
        {
            let mut state = self.inner.state.lock();
            if state.mounted || state.unmounted {
                return Ok(());
            }
            state.mounted = true;
        }
        info!(container = %self.inner.config.container, "Mounting tracking view");

        let map_result = self.inner.rebuild_map().await.map(|_| ());

        if self.inner.shutdown.is_cancelled() {
            return Ok(());
        }

        self.start_channel();

        let weak = Arc::downgrade(&self.inner);
        self.inner.poller.start(
            self.inner.config.poll_interval,
            refresh_fn(move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.fetch_and_redraw().await;
                    }
                }
            }),
            Some(&self.inner.shutdown),
        );

        map_result
    }

    fn start_channel(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Err(e) = self.inner.channel.open(tx) {
            warn!(error = %e, "Live location channel unavailable");
            let mut state = self.inner.state.lock();
            state.connection = ConnectionState::Disconnected;
            state.notices.warning("Live updates are unavailable.");
            return;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    event = rx.recv() => event,
                };
                let Some(event) = event else { break };
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_event(event);
            }
            debug!("Tracking channel consumer stopped");
        });
    }

    /// Refresh immediately, recreating the map first if it is missing.
    pub async fn refresh_now(&self) {
        let (unmounted, has_session) = {
            let state = self.inner.state.lock();
            (state.unmounted, state.binding.session().is_some())
        };
        if unmounted {
            return;
        }
        if !has_session && self.inner.rebuild_map().await.is_err() {
            return;
        }
        self.inner.fetch_and_redraw().await;
    }

    /// Run one fetch-and-redraw pass without touching the map session.
    pub async fn refresh(&self) {
        self.inner.fetch_and_redraw().await;
    }

    /// Tear down and recreate the map, then redraw.
    pub async fn rebuild_map(&self) -> Result<SessionId, MapError> {
        self.inner.rebuild_map().await
    }

    /// Apply one live position event.
    pub fn merge_location(&self, update: &LocationUpdate) -> MergeOutcome {
        self.inner.merge_location(update)
    }

    pub fn set_filter(&self, filter: VehicleFilter) {
        let mut state = self.inner.state.lock();
        if state.filter != filter {
            state.filter = filter;
            state.redraw();
        }
    }

    pub fn filter(&self) -> VehicleFilter {
        self.inner.state.lock().filter
    }

    /// Centre the map on a vehicle. Returns `false` if it cannot be placed.
    pub fn focus(&self, id: u64) -> bool {
        let state = self.inner.state.lock();
        let Some(position) = state
            .vehicles
            .iter()
            .find(|v| v.id == id)
            .and_then(|v| v.position())
        else {
            return false;
        };
        let Some(session) = state.binding.session() else {
            return false;
        };
        let view = MapView {
            center: position,
            zoom: FOCUS_ZOOM,
        };
        matches!(
            session.with_active(|engine, map| engine.set_view(map, &view)),
            Some(Ok(()))
        )
    }

    pub fn vehicles(&self) -> Vec<VehiclePosition> {
        self.inner.state.lock().vehicles.clone()
    }

    pub fn stats(&self) -> FleetStats {
        FleetStats::from_vehicles(&self.inner.state.lock().vehicles)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    pub fn marker_count(&self) -> usize {
        self.inner.state.lock().markers.len()
    }

    pub fn has_marker(&self, id: u64) -> bool {
        self.inner.state.lock().markers.contains(&id)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.state.lock().binding.current_id()
    }

    pub fn is_mounted(&self) -> bool {
        let state = self.inner.state.lock();
        state.mounted && !state.unmounted
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_running()
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.inner.state.lock().notices.take()
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        let state = self.inner.state.lock();
        TrackingSnapshot {
            vehicles: state.vehicles.clone(),
            filter: state.filter,
            connection: state.connection,
            stats: FleetStats::from_vehicles(&state.vehicles),
            markers: state.markers.len(),
            session: state.binding.current_id(),
            loading: state.loading,
            last_refresh: state.last_refresh,
            last_error: state.last_error.clone(),
        }
    }

    /// Stop polling, close the channel and destroy the map. Idempotent.
    pub fn unmount(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.unmounted {
                return;
            }
            state.unmounted = true;
        }
        info!(container = %self.inner.config.container, "Unmounting tracking view");

        self.inner.shutdown.cancel();
        self.inner.poller.stop();
        self.inner.channel.close();

        let mut state = self.inner.state.lock();
        state.teardown();
        state.vehicles.clear();
        state.loading = false;
        state.connection = ConnectionState::Closed;
    }
}

impl std::fmt::Debug for TrackingView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingView")
            .field("container", &self.inner.config.container)
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpMethod, MockApiClient};
    use crate::map::{InMemoryEngine, LatLng, MapConfig};
    use crate::tracking::channel::ManualChannel;
    use serde_json::json;

    struct Harness {
        api: Arc<MockApiClient>,
        engine: Arc<InMemoryEngine>,
        channel: Arc<ManualChannel>,
        view: TrackingView,
    }

    fn harness() -> Harness {
        let api = Arc::new(MockApiClient::new());
        let engine = Arc::new(InMemoryEngine::with_library_present());
        let sessions = MapSessions::new(engine.clone(), MapConfig::default());
        let loader = Arc::new(MapLibraryLoader::new(engine.clone()));
        let channel = Arc::new(ManualChannel::new());
        let view = TrackingView::new(
            api.clone(),
            sessions,
            loader,
            channel.clone(),
            TrackingConfig::default().with_poll_interval(Duration::from_secs(15)),
        );
        Harness {
            api,
            engine,
            channel,
            view,
        }
    }

    fn drivers() -> serde_json::Value {
        json!([
            {"id": 1, "name": "Ahmed", "lat": 24.70, "lng": 46.67, "status": "online", "is_available": 1},
            {"id": 2, "name": "Sara", "lat": 24.72, "lng": 46.69, "status": "busy"},
            {"id": 3, "name": "Omar", "status": "offline"}
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_fetches_and_draws() {
        let h = harness();
        h.api.respond_ok(HttpMethod::Get, DRIVER_LOCATIONS_PATH, drivers());

        h.view.mount().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.view.vehicles().len(), 3);
        assert_eq!(h.view.marker_count(), 2);
        assert!(h.view.is_polling());
        assert!(h.channel.is_open());
        assert_eq!(h.engine.live_map_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_redraws_markers() {
        let h = harness();
        h.api.respond_ok(HttpMethod::Get, DRIVER_LOCATIONS_PATH, drivers());
        h.view.mount().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        h.view.set_filter(VehicleFilter::Busy);
        assert_eq!(h.view.marker_count(), 1);
        assert!(h.view.has_marker(2));

        h.view.set_filter(VehicleFilter::All);
        assert_eq!(h.view.marker_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_keeps_vehicles_and_notifies() {
        let h = harness();
        h.api.respond_ok(HttpMethod::Get, DRIVER_LOCATIONS_PATH, drivers());
        h.api.respond(
            HttpMethod::Get,
            DRIVER_LOCATIONS_PATH,
            Ok(json!({"success": false, "message": "Service unavailable"})),
        );
        h.view.mount().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        h.view.refresh().await;

        assert_eq!(h.view.vehicles().len(), 3);
        let notices = h.view.take_notices();
        assert_eq!(notices.last().unwrap().message, "Service unavailable");
        assert!(h.view.snapshot().last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_state_follows_channel() {
        let h = harness();
        h.api.respond_ok(HttpMethod::Get, DRIVER_LOCATIONS_PATH, json!([]));
        h.view.mount().await.unwrap();

        h.channel.emit(ChannelEvent::Connected);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.view.connection_state(), ConnectionState::Connected);

        h.channel.emit(ChannelEvent::Disconnected {
            reason: "transport close".to_string(),
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.view.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_sets_view() {
        let h = harness();
        h.api.respond_ok(HttpMethod::Get, DRIVER_LOCATIONS_PATH, drivers());
        h.view.mount().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(h.view.focus(1));
        assert!(!h.view.focus(3));
        assert!(!h.view.focus(99));

        let map = h.engine.live_maps_in(&ContainerId::new("tracking-map"))[0];
        let snapshot = h.engine.snapshot(map).unwrap();
        assert_eq!(snapshot.view.center, LatLng::new(24.70, 46.67));
        assert_eq!(snapshot.view.zoom, FOCUS_ZOOM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_library_failure_then_refresh_retries() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, DRIVER_LOCATIONS_PATH, drivers());
        let engine = Arc::new(InMemoryEngine::new());
        engine.fail_next_script_load();
        let sessions = MapSessions::new(engine.clone(), MapConfig::default());
        let loader = Arc::new(MapLibraryLoader::new(engine.clone()));
        let view = TrackingView::new(
            api,
            sessions,
            loader,
            Arc::new(ManualChannel::new()),
            TrackingConfig::default(),
        );

        assert!(view.mount().await.is_err());
        assert!(view.session_id().is_none());
        assert!(!view.take_notices().is_empty());

        view.refresh_now().await;
        assert!(view.session_id().is_some());
        assert_eq!(view.marker_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_is_idempotent_and_clears() {
        let h = harness();
        h.api.respond_ok(HttpMethod::Get, DRIVER_LOCATIONS_PATH, drivers());
        h.view.mount().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        h.view.unmount();
        h.view.unmount();

        assert!(!h.view.is_mounted());
        assert!(h.view.vehicles().is_empty());
        assert_eq!(h.engine.live_map_count(), 0);
        assert_eq!(h.channel.close_count(), 1);
        assert_eq!(h.view.connection_state(), ConnectionState::Closed);
    }
}
