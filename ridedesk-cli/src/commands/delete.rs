//! Delete command - remove one entity after an explicit confirmation.

use std::sync::Arc;

use console::style;
use dialoguer::Confirm;
use ridedesk::api::ApiClient;
use ridedesk::crud::{ListView, NoticeLevel, Resource};

use super::common::{require_tty, with_resource, EntityKind};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the delete command.
pub async fn run(kind: EntityKind, id: u64, yes: bool, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("delete");
    let api = runner.api_client()?;

    with_resource!(kind, |R| run_delete::<R>(api, id, yes).await)
}

async fn run_delete<R: Resource>(
    api: Arc<dyn ApiClient>,
    id: u64,
    yes: bool,
) -> Result<(), CliError> {
    let mut view = ListView::<R>::new(api);

    // The prompt names the entity, so the list is loaded first.
    view.load().await?;
    let prompt = view.request_delete(id)?.prompt.clone();

    let confirmed = if yes {
        true
    } else {
        require_tty("Deleting")?;
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| CliError::Terminal(e.to_string()))?
    };

    if !confirmed {
        view.cancel_confirmation();
        println!("Cancelled; nothing was deleted.");
        return Ok(());
    }

    let result = view.confirm().await;
    for notice in view.take_notices() {
        match notice.level {
            NoticeLevel::Success => println!("{} {}", style("✓").green(), notice.message),
            NoticeLevel::Error => {}
            _ => println!("{}", notice.message),
        }
    }
    result?;

    Ok(())
}
