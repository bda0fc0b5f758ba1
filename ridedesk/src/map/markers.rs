//! Marker registry: entity id → live marker handle.
//!
//! The registry lets a view redraw without leaking markers. Every full
//! refresh goes through [`MarkerRegistry::replace_all`], which removes every
//! handle it owns before placing the new batch; live updates go through
//! [`MarkerRegistry::update_one`], which only moves markers that already
//! exist.
//!
//! # Invariants
//!
//! - No two live handles map to the same entity id.
//! - After `replace_all`, the registry holds exactly the items of the batch
//!   that had valid coordinates and were placed successfully.
//! - Markers are only attached while the owning session is active.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, warn};

use super::session::MapSession;
use super::types::{CircleSpec, LatLng, LayerSpec, MarkerHandle, MarkerIcon, MarkerSpec};

/// Something that can be drawn at a coordinate.
pub trait Placeable {
    type Id: Eq + Hash + Clone + Debug;

    /// Registry key for this item.
    fn marker_id(&self) -> Self::Id;

    /// Position, or `None` when the item has no valid coordinates.
    fn position(&self) -> Option<LatLng>;

    /// Hover title. Defaults to the id.
    fn title(&self) -> String {
        format!("{:?}", self.marker_id())
    }
}

/// Counters from one `replace_all` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Markers placed and recorded.
    pub placed: usize,
    /// Items skipped for invalid coordinates or duplicate ids.
    pub skipped: usize,
    /// Items whose marker failed to construct.
    pub failed: usize,
    /// The session went stale during the pass; nothing further was attached.
    pub stale: bool,
}

/// Tracks the markers a view has placed on its map.
#[derive(Debug)]
pub struct MarkerRegistry<K> {
    handles: HashMap<K, MarkerHandle>,
}

impl<K> Default for MarkerRegistry<K> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + Debug> MarkerRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.handles.contains_key(id)
    }

    pub fn handle(&self, id: &K) -> Option<MarkerHandle> {
        self.handles.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &K> {
        self.handles.keys()
    }

    /// Remove every owned marker from the engine and empty the mapping.
    ///
    /// If the session is no longer active its map is already gone, so the
    /// handles are simply forgotten.
    pub fn clear(&mut self, session: &MapSession) {
        if self.handles.is_empty() {
            return;
        }
        let handles: Vec<MarkerHandle> = self.handles.drain().map(|(_, h)| h).collect();
        let removed = session.with_active(|engine, map| {
            for handle in &handles {
                engine.remove_layer(map, *handle);
            }
        });
        if removed.is_none() {
            debug!(count = handles.len(), "Forgot markers of a stale session");
        }
    }

    /// Forget every handle without touching the engine.
    ///
    /// Used after the owning session was replaced wholesale.
    pub fn forget(&mut self) {
        self.handles.clear();
    }

    /// Replace every marker with one per placeable item.
    pub fn replace_all<T, I, P>(
        &mut self,
        session: &MapSession,
        items: &[T],
        icon_for: I,
        popup_for: P,
    ) -> ReplaceOutcome
    where
        T: Placeable<Id = K>,
        I: Fn(&T) -> MarkerIcon,
        P: Fn(&T) -> String,
    {
        self.replace_with(session, items, |item, position| {
            LayerSpec::Marker(MarkerSpec {
                position,
                icon: icon_for(item),
                title: item.title(),
                popup: popup_for(item),
            })
        })
    }

    /// Replace every layer with one circle per placeable item.
    pub fn replace_all_circles<T, C>(
        &mut self,
        session: &MapSession,
        items: &[T],
        circle_for: C,
    ) -> ReplaceOutcome
    where
        T: Placeable<Id = K>,
        C: Fn(&T, LatLng) -> CircleSpec,
    {
        self.replace_with(session, items, |item, position| {
            LayerSpec::Circle(circle_for(item, position))
        })
    }

    fn replace_with<T, B>(&mut self, session: &MapSession, items: &[T], build: B) -> ReplaceOutcome
    where
        T: Placeable<Id = K>,
        B: Fn(&T, LatLng) -> LayerSpec,
    {
        self.clear(session);

        let mut outcome = ReplaceOutcome::default();
        for item in items {
            let Some(position) = item.position() else {
                outcome.skipped += 1;
                continue;
            };
            let id = item.marker_id();
            if self.handles.contains_key(&id) {
                warn!(id = ?id, "Duplicate id in marker batch, keeping the first");
                outcome.skipped += 1;
                continue;
            }

            let layer = build(item, position);
            let placed = session.with_active(|engine, map| match &layer {
                LayerSpec::Marker(marker) => engine.add_marker(map, marker),
                LayerSpec::Circle(circle) => engine.add_circle(map, circle),
            });

            match placed {
                None => {
                    outcome.stale = true;
                    break;
                }
                Some(Ok(handle)) => {
                    self.handles.insert(id, handle);
                    outcome.placed += 1;
                }
                Some(Err(e)) => {
                    warn!(id = ?id, error = %e, "Failed to place marker");
                    outcome.failed += 1;
                }
            }
        }

        if outcome.stale {
            // Anything placed before the session went stale died with its map.
            self.handles.clear();
            debug!("Session went stale during redraw, batch discarded");
        }

        outcome
    }

    /// Move the marker for `id`, if one is drawn.
    ///
    /// Returns `false` without creating anything when no marker exists for
    /// `id`; new entities appear on the next full redraw.
    pub fn update_one(&self, session: &MapSession, id: &K, position: LatLng) -> bool {
        if !position.is_valid() {
            return false;
        }
        let Some(handle) = self.handles.get(id).copied() else {
            return false;
        };
        match session.with_active(|engine, map| engine.move_marker(map, handle, position)) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                warn!(id = ?id, error = %e, "Failed to move marker");
                false
            }
            None => false,
        }
    }
}

/// Escape text for inclusion in popup HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render a popup: a bold heading followed by label/value rows.
pub fn popup_html(heading: &str, rows: &[(&str, String)]) -> String {
    let mut html = format!("<div class=\"map-popup\"><strong>{}</strong>", escape_html(heading));
    for (label, value) in rows {
        html.push_str(&format!(
            "<br/><span class=\"map-popup-label\">{}:</span> {}",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::memory::InMemoryEngine;
    use crate::map::session::{MapConfig, MapSessions};
    use crate::map::types::{ContainerId, MarkerColor};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct Pin {
        id: u64,
        lat: Option<f64>,
        lng: Option<f64>,
    }

    impl Pin {
        fn at(id: u64, lat: f64, lng: f64) -> Self {
            Self {
                id,
                lat: Some(lat),
                lng: Some(lng),
            }
        }
    }

    impl Placeable for Pin {
        type Id = u64;

        fn marker_id(&self) -> u64 {
            self.id
        }

        fn position(&self) -> Option<LatLng> {
            LatLng::from_parts(self.lat, self.lng)
        }

        fn title(&self) -> String {
            format!("pin {}", self.id)
        }
    }

    fn icon(_: &Pin) -> MarkerIcon {
        MarkerIcon::new(MarkerColor::Blue, '●', "pin")
    }

    fn popup(p: &Pin) -> String {
        popup_html("Pin", &[("Id", p.id.to_string())])
    }

    fn setup() -> (Arc<InMemoryEngine>, MapSession, Arc<MapSessions>) {
        let engine = Arc::new(InMemoryEngine::new());
        let sessions = MapSessions::new(engine.clone(), MapConfig::default());
        let session = sessions
            .create_session(&ContainerId::new("test-map"))
            .unwrap();
        (engine, session, sessions)
    }

    #[test]
    fn test_replace_all_skips_invalid_coordinates() {
        let (engine, session, _sessions) = setup();
        let mut registry = MarkerRegistry::new();
        let pins = vec![
            Pin::at(1, 24.7, 46.6),
            Pin {
                id: 2,
                lat: None,
                lng: Some(46.0),
            },
            Pin::at(3, 200.0, 46.6),
            Pin::at(4, 24.8, 46.7),
        ];

        let outcome = registry.replace_all(&session, &pins, icon, popup);

        assert_eq!(outcome.placed, 2);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(engine.layer_count(session.map_id()), 2);
    }

    #[test]
    fn test_second_replace_leaves_no_leaked_handles() {
        let (engine, session, _sessions) = setup();
        let mut registry = MarkerRegistry::new();

        let first: Vec<Pin> = (0..5).map(|i| Pin::at(i, 24.0, 46.0)).collect();
        registry.replace_all(&session, &first, icon, popup);

        let second = vec![Pin::at(10, 24.1, 46.1), Pin::at(11, 24.2, 46.2)];
        registry.replace_all(&session, &second, icon, popup);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&10) && registry.contains(&11));
        assert!(!registry.contains(&0));
        assert_eq!(engine.layer_count(session.map_id()), 2);
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let (engine, session, _sessions) = setup();
        engine.fail_markers_titled("pin 2");
        let mut registry = MarkerRegistry::new();
        let pins: Vec<Pin> = (1..=4).map(|i| Pin::at(i, 24.0, 46.0)).collect();

        let outcome = registry.replace_all(&session, &pins, icon, popup);

        assert_eq!(outcome.placed, 3);
        assert_eq!(outcome.failed, 1);
        assert!(!registry.contains(&2));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let (_engine, session, _sessions) = setup();
        let mut registry = MarkerRegistry::new();
        let pins = vec![Pin::at(1, 24.0, 46.0), Pin::at(1, 25.0, 47.0)];

        let outcome = registry.replace_all(&session, &pins, icon, popup);

        assert_eq!(outcome.placed, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stale_session_attaches_nothing() {
        let (engine, stale, sessions) = setup();
        let fresh = sessions
            .create_session(&ContainerId::new("test-map"))
            .unwrap();
        let before = engine.mutation_count();
        let mut registry = MarkerRegistry::new();

        let outcome = registry.replace_all(&stale, &[Pin::at(1, 24.0, 46.0)], icon, popup);

        assert!(outcome.stale);
        assert!(registry.is_empty());
        assert_eq!(engine.mutation_count(), before);
        assert_eq!(engine.layer_count(fresh.map_id()), 0);
    }

    #[test]
    fn test_update_one_moves_existing_only() {
        let (engine, session, _sessions) = setup();
        let mut registry = MarkerRegistry::new();
        registry.replace_all(&session, &[Pin::at(1, 24.0, 46.0)], icon, popup);

        assert!(registry.update_one(&session, &1, LatLng::new(24.5, 46.5)));
        assert!(!registry.update_one(&session, &2, LatLng::new(24.5, 46.5)));
        assert!(!registry.update_one(&session, &1, LatLng::new(f64::NAN, 46.5)));

        let handle = registry.handle(&1).unwrap();
        let layer = engine.layer(session.map_id(), handle).unwrap();
        assert_eq!(layer.position(), LatLng::new(24.5, 46.5));
        assert_eq!(engine.layer_count(session.map_id()), 1);
    }

    #[test]
    fn test_circles() {
        let (engine, session, _sessions) = setup();
        let mut registry = MarkerRegistry::new();
        let pins = vec![Pin::at(1, 24.0, 46.0), Pin::at(2, 24.1, 46.1)];

        registry.replace_all_circles(&session, &pins, |_, center| CircleSpec {
            center,
            radius_m: 300.0,
            color: MarkerColor::Red,
            fill_opacity: 0.4,
            popup: String::new(),
        });

        let snapshot = engine.snapshot(session.map_id()).unwrap();
        assert_eq!(snapshot.circles().count(), 2);
        assert_eq!(snapshot.markers().count(), 0);
    }

    #[test]
    fn test_popup_escapes_html() {
        let html = popup_html("<b>Ali</b>", &[("Address", "King Fahd Rd & 5th".to_string())]);
        assert!(html.contains("&lt;b&gt;Ali&lt;/b&gt;"));
        assert!(html.contains("King Fahd Rd &amp; 5th"));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;
        use proptest::prelude::prop;

        fn pin_strategy() -> impl Strategy<Value = Pin> {
            (
                0u64..20,
                prop::option::of(-120.0f64..120.0),
                prop::option::of(-200.0f64..200.0),
            )
                .prop_map(|(id, lat, lng)| Pin { id, lat, lng })
        }

        proptest! {
            #[test]
            fn registry_matches_second_batch(
                first in prop::collection::vec(pin_strategy(), 0..30),
                second in prop::collection::vec(pin_strategy(), 0..30),
            ) {
                let (engine, session, _sessions) = setup();
                let mut registry = MarkerRegistry::new();

                registry.replace_all(&session, &first, icon, popup);
                registry.replace_all(&session, &second, icon, popup);

                let mut expected = std::collections::HashSet::new();
                for pin in &second {
                    if pin.position().is_some() {
                        expected.insert(pin.id);
                    }
                }
                prop_assert_eq!(registry.len(), expected.len());
                prop_assert_eq!(engine.layer_count(session.map_id()), expected.len());
            }
        }
    }
}
