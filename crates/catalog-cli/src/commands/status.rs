//! Status command implementation

use catalog_core::{EntityType, SyncState};
use colored::Colorize;

use super::state_label;
use crate::context::{Context, parse_types};
use crate::error::Result;

/// Run the status command
pub async fn run_status(
    ctx: &Context,
    types: &[String],
    state: Option<&str>,
    json: bool,
) -> Result<()> {
    let types = parse_types(types)?;
    let state = state.map(str::parse::<SyncState>).transpose()?;
    let snapshot = ctx.reconciler().refresh(&types).await?;

    let shown: Vec<_> = snapshot
        .entities()
        .iter()
        .filter(|e| state.is_none_or(|s| e.state == s))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    let principals = ctx.principals().await;

    println!("{}", "Catalog Status".bold());
    println!();
    println!("{}:       {}", "Root".dimmed(), ctx.root.display());
    println!("{}: {}", "Connection".dimmed(), ctx.connection_id.cyan());
    println!();

    for entity_type in types.iter().copied() {
        let of_type: Vec<_> = shown
            .iter()
            .filter(|e| e.entity.entity_type == entity_type)
            .collect();
        if of_type.is_empty() {
            continue;
        }
        println!("{} ({}):", plural(entity_type).bold(), of_type.len());
        for classified in of_type {
            let entity = &classified.entity;
            println!(
                "  {} {} {}",
                state_label(classified.state),
                entity.name(),
                entity.identity_key.dimmed()
            );
            let owners = principals.describe(&entity.ownership);
            if !owners.is_empty() {
                println!("              {} {}", "owners:".dimmed(), owners.join(", "));
            }
        }
        println!();
    }

    if shown.is_empty() {
        println!("  {}", "No entities".dimmed());
        println!();
    }

    let summary = snapshot.summary();
    println!(
        "{} synced, {} modified, {} local only, {} remote only",
        summary.synced.to_string().green(),
        summary.modified.to_string().yellow(),
        summary.local_only.to_string().cyan(),
        summary.remote_only.to_string().magenta(),
    );

    for warning in snapshot.warnings() {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    Ok(())
}

fn plural(entity_type: EntityType) -> String {
    format!("{}s", entity_type.display_name())
}
