//! Map error types.

use thiserror::Error;

use super::types::{ContainerId, EngineMapId, MarkerHandle};

/// Errors raised by the map bootstrap, sessions and engines.
///
/// None of these are fatal to a view: a failed map leaves the view in
/// list-only mode and a later manual refresh may retry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MapError {
    /// The mapping library script or stylesheet failed to load.
    #[error("Map library failed to load: {0}")]
    LibraryLoad(String),

    /// The engine could not create a map in the container.
    #[error("Failed to create map in container '{container}': {reason}")]
    CreateFailed {
        container: ContainerId,
        reason: String,
    },

    /// The engine has no map with this id (already destroyed).
    #[error("Unknown map instance {0:?}")]
    UnknownMap(EngineMapId),

    /// The engine has no layer with this handle.
    #[error("Unknown marker {0:?}")]
    UnknownMarker(MarkerHandle),

    /// Engine-specific failure.
    #[error("Map engine error: {0}")]
    Engine(String),
}
