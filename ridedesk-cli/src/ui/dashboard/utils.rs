//! Utility functions for the dashboard.
//!
//! Formatting helpers and the plain-text output used in headless mode.

use std::time::Duration;

use ridedesk::tracking::TrackingSnapshot;

/// Format duration as HH:MM:SS or MM:SS.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

/// One status line for non-interactive terminals.
pub fn status_line(snapshot: &TrackingSnapshot, uptime: Duration) -> String {
    let stats = snapshot.stats;
    let refreshed = snapshot
        .last_refresh
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "[{}] Drivers: {} ({} online, {} busy, {} offline) | Markers: {} | Live: {} | Refreshed: {}",
        format_duration(uptime),
        stats.total,
        stats.online,
        stats.busy,
        stats.offline,
        snapshot.markers,
        snapshot.connection.label(),
        refreshed,
    )
}

/// Simple non-TUI fallback for non-interactive terminals.
pub fn print_simple_status(snapshot: &TrackingSnapshot, uptime: Duration) {
    println!("{}", status_line(snapshot, uptime));
    if let Some(error) = &snapshot.last_error {
        println!("  last error: {}", error);
    }
}

/// Print final session summary.
pub fn print_session_summary(snapshot: &TrackingSnapshot, uptime: Duration) {
    let stats = snapshot.stats;
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!("  Drivers tracked: {}", stats.total);
    println!("  Available: {}", stats.available);
    println!("  Without position: {}", stats.unplaced);
    println!("  Uptime: {}", format_duration(uptime));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridedesk::tracking::{ConnectionState, FleetStats, VehicleFilter};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(59)), "00:59");
        assert_eq!(format_duration(Duration::from_secs(61)), "01:01");
        assert_eq!(format_duration(Duration::from_secs(3_661)), "01:01:01");
    }

    #[test]
    fn test_status_line_before_first_refresh() {
        let snapshot = TrackingSnapshot {
            vehicles: Vec::new(),
            filter: VehicleFilter::All,
            connection: ConnectionState::Connecting,
            stats: FleetStats::default(),
            markers: 0,
            session: None,
            loading: true,
            last_refresh: None,
            last_error: None,
        };
        let line = status_line(&snapshot, Duration::from_secs(5));
        assert!(line.starts_with("[00:05] Drivers: 0"));
        assert!(line.ends_with("Refreshed: never"));
        assert!(line.contains("Live: Connecting"));
    }
}
