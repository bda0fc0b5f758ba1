//! TUI application for the live fleet dashboard.
//!
//! # Architecture
//!
//! - `run_tracking_tui()` - interactive dashboard with an event loop
//! - `run_headless()` - periodic status lines for non-TTY environments
//!
//! The `track` command builds and mounts the [`TrackingView`], hands it to
//! one of these loops and unmounts it when the loop returns.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use ridedesk::crud::NoticeLevel;
use ridedesk::map::{ContainerId, InMemoryEngine, MapSnapshot};
use ridedesk::tracking::TrackingView;

use crate::error::CliError;
use crate::ui::{self, Dashboard, DashboardEvent};

/// Everything the interactive dashboard needs.
pub struct TrackingAppConfig<'a> {
    pub view: &'a TrackingView,
    /// Engine rendering the view's map; read back to draw the map pane.
    pub engine: &'a InMemoryEngine,
    pub container: &'a ContainerId,
    /// Cancelled by the Ctrl+C handler.
    pub shutdown: CancellationToken,
}

fn map_snapshot(engine: &InMemoryEngine, container: &ContainerId) -> Option<MapSnapshot> {
    engine
        .live_maps_in(container)
        .first()
        .and_then(|id| engine.snapshot(*id))
}

/// Run the interactive dashboard until the user quits or Ctrl+C.
pub async fn run_tracking_tui(config: TrackingAppConfig<'_>) -> Result<(), CliError> {
    let TrackingAppConfig {
        view,
        engine,
        container,
        shutdown,
    } = config;

    let mut dashboard = Dashboard::new()
        .map_err(|e| CliError::Terminal(format!("Failed to create dashboard: {}", e)))?;

    let tick_rate = Duration::from_millis(100);
    let mut last_draw: Option<Instant> = None;

    while !shutdown.is_cancelled() {
        match dashboard.poll_event() {
            Ok(Some(DashboardEvent::Quit)) => break,
            Ok(Some(DashboardEvent::CycleFilter)) => {
                let next = view.filter().next();
                tracing::debug!(filter = next.label(), "Filter changed");
                view.set_filter(next);
            }
            Ok(Some(DashboardEvent::Refresh)) => view.refresh_now().await,
            Ok(Some(DashboardEvent::RebuildMap)) => {
                if let Err(e) = view.rebuild_map().await {
                    tracing::warn!(error = %e, "Map rebuild failed");
                    dashboard.set_status(NoticeLevel::Error, format!("Map rebuild failed: {}", e));
                }
            }
            Ok(None) => {}
            Err(e) => return Err(CliError::Terminal(format!("Dashboard error: {}", e))),
        }

        for notice in view.take_notices() {
            dashboard.set_status(notice.level, notice.message);
        }

        if last_draw.map_or(true, |at| at.elapsed() >= tick_rate) {
            let snapshot = view.snapshot();
            let map = map_snapshot(engine, container);
            dashboard
                .draw(&snapshot, map.as_ref())
                .map_err(|e| CliError::Terminal(format!("Dashboard draw error: {}", e)))?;
            last_draw = Some(Instant::now());
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    Ok(())
}

/// Run in headless mode (non-TTY environments).
///
/// Prints one status line per poll interval and every notice as it arrives,
/// until the shutdown token is cancelled.
pub async fn run_headless(
    view: &TrackingView,
    shutdown: CancellationToken,
    interval: Duration,
) -> Result<(), CliError> {
    println!("Tracking fleet. Press Ctrl+C to stop.");
    println!();

    let started = Instant::now();
    let mut status = tokio::time::interval(interval);
    let mut notices = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = status.tick() => {
                ui::dashboard::print_simple_status(&view.snapshot(), started.elapsed());
            }
            _ = notices.tick() => {
                for notice in view.take_notices() {
                    println!("[{}] {}", notice.level, notice.message);
                }
            }
        }
    }

    ui::dashboard::print_session_summary(&view.snapshot(), started.elapsed());
    Ok(())
}
