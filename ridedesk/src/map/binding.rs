//! A view's slot for its map session.

use std::sync::Arc;

use super::error::MapError;
use super::session::{MapSession, MapSessions, SessionId};
use super::types::ContainerId;

/// Owns the current session of one map view.
///
/// Views keep this inside their state lock. Data loads capture
/// [`current_id`](Self::current_id) when they start and compare it again
/// before applying results.
#[derive(Debug)]
pub struct MapBinding {
    container: ContainerId,
    sessions: Arc<MapSessions>,
    session: Option<MapSession>,
}

impl MapBinding {
    pub fn new(container: ContainerId, sessions: Arc<MapSessions>) -> Self {
        Self {
            container,
            sessions,
            session: None,
        }
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    /// Build a fresh session, tearing down the previous one first.
    pub fn attach(&mut self) -> Result<MapSession, MapError> {
        // Drop our handle first so a failed create leaves nothing behind.
        self.session = None;
        let session = self.sessions.create_session(&self.container)?;
        self.session = Some(session.clone());
        Ok(session)
    }

    pub fn session(&self) -> Option<&MapSession> {
        self.session.as_ref()
    }

    /// Identity of the session a load should be applied to.
    pub fn current_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(MapSession::id)
    }

    /// Whether a load captured with `captured` may still be applied.
    ///
    /// True when the view still has the same session (or still has none) and
    /// that session has not been replaced behind the view's back.
    pub fn is_current(&self, captured: Option<SessionId>) -> bool {
        if self.current_id() != captured {
            return false;
        }
        self.session.as_ref().map_or(true, MapSession::is_active)
    }

    /// Destroy the session, if any. Idempotent.
    pub fn detach(&mut self) {
        if let Some(session) = self.session.take() {
            session.destroy();
        }
    }
}
