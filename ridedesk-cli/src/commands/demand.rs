//! Demand command - print one demand heatmap snapshot.

use console::style;
use ridedesk::crud::NoticeLevel;
use ridedesk::demand::{DemandPeriod, DemandView};
use ridedesk::map::LatLng;

use super::list::print_table;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the demand command.
pub struct DemandArgs {
    pub period: String,
    pub verbose: bool,
}

/// Run the demand command.
pub async fn run(args: DemandArgs) -> Result<(), CliError> {
    let period = DemandPeriod::parse(&args.period).ok_or_else(|| {
        CliError::Config(format!(
            "Unknown period '{}'. Use hour, today, week or month.",
            args.period
        ))
    })?;

    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("demand");

    let api = runner.api_client()?;
    let map = runner.terminal_map();
    let config = runner
        .config()
        .demand_config()
        .with_poll_interval(None)
        .with_period(period);

    let view = DemandView::new(api, map.sessions.clone(), map.loader.clone(), config);
    let mounted = view.mount().await;

    let failed = view
        .take_notices()
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .map(|n| n.message)
        .last();

    let outcome = match (mounted, failed) {
        (Err(e), _) => Err(CliError::from(e)),
        (Ok(()), Some(message)) => Err(CliError::Terminal(message)),
        (Ok(()), None) => {
            print_snapshot(&view);
            Ok(())
        }
    };

    view.unmount();
    outcome
}

fn print_snapshot(view: &DemandView) {
    let summary = view.summary();
    println!(
        "{} ({})",
        style("Demand snapshot").bold(),
        view.period().as_query()
    );
    println!(
        "{} zones, {} requests: {} high, {} medium, {} low; {} rides",
        summary.zones,
        summary.total_requests,
        style(summary.high).red(),
        style(summary.medium).yellow(),
        style(summary.low).green(),
        summary.rides
    );
    println!();

    let mut zones = view.zones();
    zones.sort_by(|a, b| b.request_count.cmp(&a.request_count));
    let zone_rows: Vec<Vec<String>> = zones
        .iter()
        .map(|z| {
            vec![
                z.label.clone().unwrap_or_default(),
                format_position(z.position()),
                z.request_count.to_string(),
                z.intensity().label().to_string(),
            ]
        })
        .collect();
    print_table(&["Zone", "Position", "Requests", "Intensity"], &zone_rows);
    println!();

    let ride_rows: Vec<Vec<String>> = view
        .rides()
        .iter()
        .map(|r| {
            vec![
                r.ride_id.to_string(),
                r.status.clone(),
                r.address_text.clone(),
            ]
        })
        .collect();
    print_table(&["Ride", "Status", "Pickup"], &ride_rows);
}

fn format_position(position: Option<LatLng>) -> String {
    position
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string())
}
