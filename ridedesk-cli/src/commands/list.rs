//! List command - print one entity list as a table.

use std::sync::Arc;

use console::{style, Term};
use ridedesk::api::ApiClient;
use ridedesk::crud::{ListView, Resource};

use super::common::{parse_pairs, with_resource, EntityKind};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the list command.
pub struct ListArgs {
    pub kind: EntityKind,
    pub search: Option<String>,
    pub filters: Vec<String>,
    pub scopes: Vec<String>,
    pub verbose: bool,
}

/// Run the list command.
pub async fn run(args: ListArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("list");
    let api = runner.api_client()?;

    with_resource!(args.kind, |R| run_list::<R>(api, &args).await)
}

async fn run_list<R: Resource>(api: Arc<dyn ApiClient>, args: &ListArgs) -> Result<(), CliError> {
    let mut view = ListView::<R>::new(api);

    for (key, value) in parse_pairs(&args.scopes)? {
        view.set_scope(&key, value)?;
    }

    let filters = parse_pairs(&args.filters)?;
    let filter = R::filter_from_pairs(filters.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    view.set_filter(filter);

    if let Some(search) = &args.search {
        view.set_search(search.as_str());
    }

    view.load().await?;

    let rows: Vec<Vec<String>> = view.visible().into_iter().map(R::row).collect();
    print_table(R::COLUMNS, &rows);

    let stats = view.stats();
    println!();
    if R::HAS_STATUS {
        println!(
            "{} shown, {} loaded ({} active, {} inactive)",
            rows.len(),
            stats.total,
            stats.active,
            stats.inactive
        );
    } else {
        println!("{} shown, {} loaded", rows.len(), stats.total);
    }

    Ok(())
}

/// Print rows under a bold header, clipped to the terminal width.
pub fn print_table(columns: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let term_width = Term::stdout().size_checked().map(|(_, w)| w as usize);
    let clip = |line: String| match term_width {
        Some(max) if console::measure_text_width(&line) > max => {
            console::truncate_str(&line, max, "…").into_owned()
        }
        _ => line,
    };

    let header = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", style(clip(header)).bold());

    if rows.is_empty() {
        println!("{}", style("(no matching entries)").dim());
        return;
    }

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", clip(line.trim_end().to_string()));
    }
}
