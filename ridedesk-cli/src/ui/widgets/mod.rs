//! Dashboard widgets for the TUI.

mod connection;
mod fleet;
mod map;

use ratatui::style::Color;
use ridedesk::map::MarkerColor;

pub use connection::ConnectionWidget;
pub use fleet::FleetTableWidget;
pub use map::MapWidget;

/// Terminal color for a marker palette entry.
pub fn marker_color(color: MarkerColor) -> Color {
    match color {
        MarkerColor::Green => Color::Green,
        MarkerColor::Orange => Color::Yellow,
        MarkerColor::Red => Color::Red,
        MarkerColor::Blue => Color::Blue,
        MarkerColor::Purple => Color::Magenta,
        MarkerColor::Gray => Color::DarkGray,
    }
}
