//! Map bootstrap, sessions and marker management.
//!
//! # Architecture
//!
//! ```text
//! MapLibraryLoader ──(once per process)──► host page / runtime
//!
//! MapSessions ──► MapEngine            one active map per container
//!     │
//!     └──► MapSession ──► MarkerRegistry   id → handle, replace / move
//! ```
//!
//! Views never reach the engine directly. They hold a [`MapBinding`], pass
//! its [`MapSession`] to a [`MarkerRegistry`], and every engine call goes
//! through [`MapSession::with_active`], so work for a replaced session is
//! silently dropped.

mod binding;
mod engine;
mod error;
mod library;
mod markers;
mod memory;
mod session;
mod types;

pub use binding::MapBinding;
pub use engine::MapEngine;
pub use error::MapError;
pub use library::{MapAsset, MapAssetHost, MapLibraryLoader, LEAFLET_SCRIPT, LEAFLET_STYLESHEET};
pub use markers::{escape_html, popup_html, MarkerRegistry, Placeable, ReplaceOutcome};
pub use memory::{InMemoryEngine, MapSnapshot};
pub use session::{MapConfig, MapSession, MapSessions, SessionId};
pub use types::{
    CircleSpec, ContainerId, EngineMapId, LatLng, LayerSpec, MapView, MarkerColor, MarkerHandle,
    MarkerIcon, MarkerSpec, TileLayer, DEFAULT_CENTER, DEFAULT_ZOOM, OSM_ATTRIBUTION,
    OSM_MAX_ZOOM, OSM_TILE_URL,
};
