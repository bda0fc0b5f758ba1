//! Load state of a list view.

/// Where a list is in its fetch cycle.
///
/// ```text
/// Idle ──► Loading ──► Loaded
///             ▲    └─► LoadError
///             └──────────┘ (refetch)
/// ```
///
/// Mutations are tracked separately, so a list can be `Loaded` while a
/// create or delete is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    LoadError(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::LoadError(message) => Some(message),
            _ => None,
        }
    }
}
