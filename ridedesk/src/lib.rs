//! RideDesk - administrative console core for a ride-hailing platform
//!
//! This library holds the view-models behind the RideDesk admin console:
//! generic CRUD list screens for platform entities, a live vehicle tracking
//! map that merges REST polling with a push location stream, and a demand
//! heatmap.
//!
//! Rendering is abstracted behind [`map::MapEngine`], so the same view-models
//! drive a terminal dashboard, a browser bridge, or the in-memory engine used
//! by the test suite.
//!
//! # Module Map
//!
//! ```text
//! api ──────────► crud ──────► entities        (list screens)
//!  │
//!  ├────────────► tracking ◄── map             (vehicle tracking)
//!  │                  ▲
//!  └────────────► demand ◄──── map             (demand heatmap)
//!
//! config, logging                              (ambient)
//! ```

pub mod api;
pub mod config;
pub mod crud;
pub mod demand;
pub mod entities;
pub mod logging;
pub mod map;
pub mod tracking;

/// Library version, reported by the CLI at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
