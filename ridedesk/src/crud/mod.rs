//! Generic CRUD list view-model.
//!
//! ```text
//! ListView<R: Resource>
//!   load ──► Loading ──► Loaded | LoadError     (snapshot kept on error)
//!   visible() = snapshot ∩ filter ∩ search      (pure, no network)
//!   create / update / toggle_status / run_action
//!       └─► execute ──► notice ──► load
//!   request_delete ──► PendingConfirmation ──► confirm | cancel_confirmation
//! ```

mod confirm;
mod error;
mod notice;
mod resource;
mod state;
mod view;

pub use confirm::{ConfirmTarget, PendingConfirmation};
pub use error::{CrudError, CrudResult};
pub use notice::{Notice, NoticeBoard, NoticeLevel, DEFAULT_NOTICE_CAPACITY};
pub use resource::{status_label, unknown_filter_key, Resource, StatusFilter};
pub use state::LoadState;
pub use view::{ListStats, ListView};
