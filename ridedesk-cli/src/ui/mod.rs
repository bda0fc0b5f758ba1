//! Terminal UI for the live fleet dashboard.
//!
//! # Module Structure
//!
//! - `dashboard` - terminal setup, event handling and frame layout
//! - `widgets` - reusable panes (map, fleet table, connection status)

pub mod dashboard;
pub mod widgets;

pub use dashboard::{Dashboard, DashboardEvent};
