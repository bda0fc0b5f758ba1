//! Live vehicle tracking.
//!
//! A [`TrackingView`] merges two sources into one vehicle collection:
//!
//! - a [`Poller`] that periodically replaces the collection from the REST API
//!   and redraws every marker;
//! - a [`LiveLocationChannel`] whose position events update vehicles in place
//!   and move their markers.
//!
//! Full refreshes are the only way vehicles disappear. Push events never
//! delete, and a push for an unknown driver adds a placeholder entry that is
//! drawn on the next refresh.

pub mod channel;
mod model;
mod poller;
mod view;

pub use channel::{
    socket_url, ChannelError, ChannelEvent, ConnectionState, LiveLocationChannel, ManualChannel,
    SocketIoChannel, SocketIoConfig, DEFAULT_LOCATION_EVENT, DEFAULT_RECONNECT_DELAY,
};
pub use model::{FleetStats, LocationUpdate, OnlineState, VehicleFilter, VehiclePosition};
pub use poller::{refresh_fn, Poller, RefreshFn, DEFAULT_POLL_INTERVAL_MS};
pub use view::{
    MergeOutcome, TrackingConfig, TrackingSnapshot, TrackingView, DRIVER_LOCATIONS_PATH,
    FOCUS_ZOOM,
};
