//! Demand heatmap view-model.
//!
//! Zones and ride pickups are fetched together on every refresh and replace
//! the previous snapshot wholesale. Zones are drawn as intensity-coloured
//! circles, rides as point markers. Either layer can be hidden.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model::{DemandPeriod, DemandSummary, DemandZone, IndexedZone, RideMarker};
use crate::api::{fetch_list, ApiClient, ApiRequest};
use crate::crud::{Notice, NoticeBoard};
use crate::map::{
    ContainerId, MapBinding, MapError, MapLibraryLoader, MapSessions, MarkerRegistry, SessionId,
};
use crate::tracking::{refresh_fn, Poller, DEFAULT_POLL_INTERVAL_MS};

pub const DEMAND_ZONES_PATH: &str = "/admin/demand/zones";
pub const DEMAND_RIDES_PATH: &str = "/admin/demand/rides";

#[derive(Debug, Clone, PartialEq)]
pub struct DemandConfig {
    pub container: ContainerId,
    pub zones_path: String,
    pub rides_path: String,
    /// `None` disables periodic refresh.
    pub poll_interval: Option<Duration>,
    /// Time window of the first fetch.
    pub period: DemandPeriod,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            container: ContainerId::new("demand-map"),
            zones_path: DEMAND_ZONES_PATH.to_string(),
            rides_path: DEMAND_RIDES_PATH.to_string(),
            poll_interval: Some(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)),
            period: DemandPeriod::default(),
        }
    }
}

impl DemandConfig {
    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_period(mut self, period: DemandPeriod) -> Self {
        self.period = period;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DemandSnapshot {
    pub zones: Vec<DemandZone>,
    pub rides: Vec<RideMarker>,
    pub period: DemandPeriod,
    pub summary: DemandSummary,
    pub show_zones: bool,
    pub show_rides: bool,
    pub session: Option<SessionId>,
    pub last_refresh: Option<DateTime<Utc>>,
}

struct DemandState {
    binding: MapBinding,
    zone_layers: MarkerRegistry<usize>,
    ride_markers: MarkerRegistry<u64>,
    zones: Vec<DemandZone>,
    rides: Vec<RideMarker>,
    period: DemandPeriod,
    show_zones: bool,
    show_rides: bool,
    notices: NoticeBoard,
    mounted: bool,
    unmounted: bool,
    last_refresh: Option<DateTime<Utc>>,
}

impl DemandState {
    fn redraw(&mut self) {
        let Some(session) = self.binding.session().cloned() else {
            return;
        };

        let zones: Vec<IndexedZone<'_>> = if self.show_zones {
            self.zones
                .iter()
                .enumerate()
                .map(|(index, zone)| IndexedZone { index, zone })
                .collect()
        } else {
            Vec::new()
        };
        let zone_outcome = self
            .zone_layers
            .replace_all_circles(&session, &zones, |z, center| z.zone.circle(center));

        let rides: &[RideMarker] = if self.show_rides { &self.rides } else { &[] };
        let ride_outcome =
            self.ride_markers
                .replace_all(&session, rides, RideMarker::icon, RideMarker::popup);

        debug!(
            zones = zone_outcome.placed,
            rides = ride_outcome.placed,
            skipped = zone_outcome.skipped + ride_outcome.skipped,
            "Demand layers redrawn"
        );
    }

    fn teardown(&mut self) {
        if let Some(session) = self.binding.session().cloned() {
            self.zone_layers.clear(&session);
            self.ride_markers.clear(&session);
        }
        self.zone_layers.forget();
        self.ride_markers.forget();
        self.binding.detach();
    }
}

struct Inner {
    api: Arc<dyn ApiClient>,
    loader: Arc<MapLibraryLoader>,
    config: DemandConfig,
    poller: Poller,
    shutdown: CancellationToken,
    state: Mutex<DemandState>,
}

impl Inner {
    async fn fetch_and_redraw(&self) {
        let (captured, period) = {
            let state = self.state.lock();
            if state.unmounted {
                return;
            }
            (state.binding.current_id(), state.period)
        };

        let zones_request =
            ApiRequest::get(self.config.zones_path.clone()).with_query("period", period.as_query());
        let rides_request =
            ApiRequest::get(self.config.rides_path.clone()).with_query("period", period.as_query());
        let (zones, rides) = tokio::join!(
            fetch_list::<DemandZone>(self.api.as_ref(), zones_request),
            fetch_list::<RideMarker>(self.api.as_ref(), rides_request),
        );

        let mut state = self.state.lock();
        if state.unmounted || !state.binding.is_current(captured) || state.period != period {
            debug!("Discarding demand fetch for a replaced map or period");
            return;
        }

        let mut changed = false;
        match zones {
            Ok(zones) => {
                state.zones = zones;
                changed = true;
            }
            Err(e) => {
                warn!(error = %e, "Demand zone refresh failed");
                state.notices.error(e.user_message());
            }
        }
        match rides {
            Ok(rides) => {
                state.rides = rides;
                changed = true;
            }
            Err(e) => {
                warn!(error = %e, "Ride marker refresh failed");
                state.notices.error(e.user_message());
            }
        }

        if changed {
            state.last_refresh = Some(Utc::now());
            state.redraw();
        }
    }

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
        state.zone_layers.forget();
        state.ride_markers.forget();
        match state.binding.attach() {
            Ok(session) => {
                state.redraw();
                Ok(session.id())
            }
            Err(e) => {
                warn!(error = %e, "Failed to create demand map");
                state.notices.error("The map could not be created.");
                Err(e)
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.state.get_mut().teardown();
    }
}

/// Demand heatmap: zone circles plus ride pickup markers.
#[derive(Clone)]
pub struct DemandView {
    inner: Arc<Inner>,
}

impl DemandView {
    pub fn new(
        api: Arc<dyn ApiClient>,
        sessions: Arc<MapSessions>,
        loader: Arc<MapLibraryLoader>,
        config: DemandConfig,
    ) -> Self {
        let binding = MapBinding::new(config.container.clone(), sessions);
        let period = config.period;
        Self {
            inner: Arc::new(Inner {
                api,
                loader,
                config,
                poller: Poller::new(),
                shutdown: CancellationToken::new(),
                state: Mutex::new(DemandState {
                    binding,
                    zone_layers: MarkerRegistry::new(),
                    ride_markers: MarkerRegistry::new(),
                    zones: Vec::new(),
                    rides: Vec::new(),
                    period,
                    show_zones: true,
                    show_rides: true,
                    notices: NoticeBoard::new(),
                    mounted: false,
                    unmounted: false,
                    last_refresh: None,
                }),
            }),
        }
    }

    /// Load the map and fetch the first snapshot.
    ///
    /// With a poll interval configured the poller performs the first fetch;
    /// otherwise it happens inline.
    pub async fn mount(&self) -> Result<(), MapError> {
        {
            let mut state = self.inner.state.lock();
            if state.mounted || state.unmounted {
                return Ok(());
            }
            state.mounted = true;
        }
        info!(container = %self.inner.config.container, "Mounting demand view");

        let map_result = self.inner.rebuild_map().await.map(|_| ());

        match self.inner.config.poll_interval {
            Some(interval) => {
                let weak = Arc::downgrade(&self.inner);
                self.inner.poller.start(
                    interval,
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
            }
            None => self.inner.fetch_and_redraw().await,
        }

        map_result
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

    /// Switch the time window and refetch.
    pub async fn set_period(&self, period: DemandPeriod) {
        {
            let mut state = self.inner.state.lock();
            if state.unmounted || state.period == period {
                return;
            }
            state.period = period;
        }
        self.inner.fetch_and_redraw().await;
    }

    pub fn period(&self) -> DemandPeriod {
        self.inner.state.lock().period
    }

    pub fn set_layers(&self, show_zones: bool, show_rides: bool) {
        let mut state = self.inner.state.lock();
        if state.show_zones != show_zones || state.show_rides != show_rides {
            state.show_zones = show_zones;
            state.show_rides = show_rides;
            state.redraw();
        }
    }

    pub fn zones(&self) -> Vec<DemandZone> {
        self.inner.state.lock().zones.clone()
    }

    pub fn rides(&self) -> Vec<RideMarker> {
        self.inner.state.lock().rides.clone()
    }

    pub fn summary(&self) -> DemandSummary {
        let state = self.inner.state.lock();
        DemandSummary::compute(&state.zones, &state.rides)
    }

    pub fn zone_layer_count(&self) -> usize {
        self.inner.state.lock().zone_layers.len()
    }

    pub fn ride_marker_count(&self) -> usize {
        self.inner.state.lock().ride_markers.len()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.state.lock().binding.current_id()
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.inner.state.lock().notices.take()
    }

    pub fn snapshot(&self) -> DemandSnapshot {
        let state = self.inner.state.lock();
        DemandSnapshot {
            zones: state.zones.clone(),
            rides: state.rides.clone(),
            period: state.period,
            summary: DemandSummary::compute(&state.zones, &state.rides),
            show_zones: state.show_zones,
            show_rides: state.show_rides,
            session: state.binding.current_id(),
            last_refresh: state.last_refresh,
        }
    }

    /// Stop refreshing and destroy the map. Idempotent.
    pub fn unmount(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.unmounted {
                return;
            }
            state.unmounted = true;
        }
        info!(container = %self.inner.config.container, "Unmounting demand view");

        self.inner.shutdown.cancel();
        self.inner.poller.stop();

        let mut state = self.inner.state.lock();
        state.teardown();
        state.zones.clear();
        state.rides.clear();
    }
}

impl std::fmt::Debug for DemandView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemandView")
            .field("container", &self.inner.config.container)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpMethod, MockApiClient};
    use crate::map::{InMemoryEngine, MapConfig};
    use serde_json::json;

    fn setup() -> (Arc<MockApiClient>, Arc<InMemoryEngine>, DemandView) {
        let api = Arc::new(MockApiClient::new());
        let engine = Arc::new(InMemoryEngine::with_library_present());
        let sessions = MapSessions::new(engine.clone(), MapConfig::default());
        let loader = Arc::new(MapLibraryLoader::new(engine.clone()));
        let view = DemandView::new(
            api.clone(),
            sessions,
            loader,
            DemandConfig::default().with_poll_interval(None),
        );
        (api, engine, view)
    }

    fn script(api: &MockApiClient) {
        api.respond_ok(
            HttpMethod::Get,
            DEMAND_ZONES_PATH,
            json!([
                {"lat": 24.70, "lng": 46.67, "requests": 25},
                {"lat": 24.71, "lng": 46.68, "requests": 4},
                {"lat": null, "lng": 46.68, "requests": 9}
            ]),
        );
        api.respond_ok(
            HttpMethod::Get,
            DEMAND_RIDES_PATH,
            json!({"data": [
                {"id": 1, "pickup_lat": 24.7, "pickup_lng": 46.6, "status": "pending"},
                {"id": 2, "pickup_lat": 24.8, "pickup_lng": 46.7, "status": "accepted"}
            ], "total": 2}),
        );
    }

    #[tokio::test]
    async fn test_mount_draws_both_layers() {
        let (api, engine, view) = setup();
        script(&api);

        view.mount().await.unwrap();

        assert_eq!(view.zones().len(), 3);
        assert_eq!(view.zone_layer_count(), 2);
        assert_eq!(view.ride_marker_count(), 2);

        let map = engine.live_maps_in(&ContainerId::new("demand-map"))[0];
        let snapshot = engine.snapshot(map).unwrap();
        assert_eq!(snapshot.circles().count(), 2);
        assert_eq!(snapshot.markers().count(), 2);

        let summary = view.summary();
        assert_eq!(summary.total_requests, 38);
        assert_eq!(summary.high, 1);
    }

    #[tokio::test]
    async fn test_period_is_sent_as_query() {
        let (api, _engine, view) = setup();
        script(&api);
        view.mount().await.unwrap();

        view.set_period(DemandPeriod::Week).await;

        let last_zone_call = api
            .calls()
            .into_iter()
            .filter(|c| c.path == DEMAND_ZONES_PATH)
            .last()
            .unwrap();
        assert_eq!(last_zone_call.query_value("period"), Some("week"));
        assert_eq!(view.period(), DemandPeriod::Week);
    }

    #[tokio::test]
    async fn test_hiding_layers() {
        let (api, engine, view) = setup();
        script(&api);
        view.mount().await.unwrap();

        view.set_layers(false, true);
        assert_eq!(view.zone_layer_count(), 0);

        let map = engine.live_maps_in(&ContainerId::new("demand-map"))[0];
        assert_eq!(engine.layer_count(map), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_layer() {
        let (api, _engine, view) = setup();
        api.respond_ok(
            HttpMethod::Get,
            DEMAND_ZONES_PATH,
            json!([{"lat": 24.70, "lng": 46.67, "requests": 25}]),
        );

        view.mount().await.unwrap();

        assert_eq!(view.zone_layer_count(), 1);
        assert!(view.rides().is_empty());
        assert_eq!(view.take_notices().len(), 1);
    }

    #[tokio::test]
    async fn test_unmount_destroys_map() {
        let (api, engine, view) = setup();
        script(&api);
        view.mount().await.unwrap();

        view.unmount();
        view.unmount();

        assert_eq!(engine.live_map_count(), 0);
        assert!(view.zones().is_empty());
        assert!(view.session_id().is_none());
    }
}
