//! Track command - live fleet dashboard.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ridedesk::config::MIN_POLL_INTERVAL_MS;
use ridedesk::tracking::{LiveLocationChannel, ManualChannel, SocketIoChannel, TrackingView};

use crate::error::CliError;
use crate::runner::CliRunner;
use crate::tui_app::{self, TrackingAppConfig};

/// Arguments for the track command.
pub struct TrackArgs {
    pub headless: bool,
    pub no_live: bool,
    pub interval: Option<u64>,
    pub verbose: bool,
}

/// Run the track command.
pub async fn run(args: TrackArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("track");
    let config = runner.config();

    let mut tracking_config = config.tracking_config();
    if let Some(secs) = args.interval {
        let interval = Duration::from_secs(secs);
        if interval < Duration::from_millis(MIN_POLL_INTERVAL_MS) {
            return Err(CliError::Config(format!(
                "--interval must be at least {} second(s)",
                MIN_POLL_INTERVAL_MS / 1000
            )));
        }
        tracking_config = tracking_config.with_poll_interval(interval);
    }

    let channel: Arc<dyn LiveLocationChannel> = if args.no_live {
        info!("Live channel disabled, polling only");
        Arc::new(ManualChannel::new())
    } else {
        Arc::new(SocketIoChannel::new(config.socket_config()?))
    };

    let api = runner.api_client()?;
    let map = runner.terminal_map();
    let container = tracking_config.container.clone();
    let poll_interval = tracking_config.poll_interval;

    let view = TrackingView::new(
        api,
        map.sessions.clone(),
        map.loader.clone(),
        channel,
        tracking_config,
    );

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::Terminal(format!("Failed to install Ctrl+C handler: {}", e)))?;

    // A map that fails to load is retried by refresh or rebuild.
    if let Err(e) = view.mount().await {
        warn!(error = %e, "Tracking map failed to load");
    }

    let interactive = atty::is(atty::Stream::Stdout);
    let result = if args.headless || !interactive {
        tui_app::run_headless(&view, shutdown, poll_interval).await
    } else {
        tui_app::run_tracking_tui(TrackingAppConfig {
            view: &view,
            engine: &map.engine,
            container: &container,
            shutdown,
        })
        .await
    };

    view.unmount();
    result
}
