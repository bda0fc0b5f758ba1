//! RideDesk CLI - terminal console for the ride-hailing admin backend
//!
//! Lists and deletes platform entities, shows a live fleet dashboard and
//! prints demand snapshots. Every command reads `~/.config/ridedesk/config.ini`
//! and honours the `RIDEDESK_API_URL` and `RIDEDESK_API_TOKEN` overrides.

mod commands;
mod error;
mod runner;
mod tui_app;
mod ui;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::common::EntityKind;
use commands::config::ConfigCommands;
use commands::demand::DemandArgs;
use commands::list::ListArgs;
use commands::track::TrackArgs;

#[derive(Debug, Parser)]
#[command(name = "ridedesk", version, about = "Ride-hailing admin console")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List entities of one kind
    List {
        /// Entity kind to list
        #[arg(value_enum)]
        kind: EntityKind,

        /// Case-insensitive search across the visible columns
        #[arg(short, long)]
        search: Option<String>,

        /// Local filter as key=value (repeatable), e.g. --filter status=active
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Server-side scope as key=value (repeatable)
        #[arg(long = "scope", value_name = "KEY=VALUE")]
        scopes: Vec<String>,
    },

    /// Delete one entity after confirmation
    Delete {
        #[arg(value_enum)]
        kind: EntityKind,

        /// Identifier of the entity to delete
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Live fleet dashboard
    Track {
        /// Print periodic status lines instead of the dashboard
        #[arg(long)]
        headless: bool,

        /// Poll only; do not open the live location channel
        #[arg(long)]
        no_live: bool,

        /// Override the poll interval in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Print a demand snapshot
    Demand {
        /// Time window: hour, today, week or month
        #[arg(short, long, default_value = "today")]
        period: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::List {
            kind,
            search,
            filters,
            scopes,
        } => {
            commands::list::run(ListArgs {
                kind,
                search,
                filters,
                scopes,
                verbose,
            })
            .await
        }
        Commands::Delete { kind, id, yes } => commands::delete::run(kind, id, yes, verbose).await,
        Commands::Track {
            headless,
            no_live,
            interval,
        } => {
            commands::track::run(TrackArgs {
                headless,
                no_live,
                interval,
                verbose,
            })
            .await
        }
        Commands::Demand { period } => commands::demand::run(DemandArgs { period, verbose }).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}
