//! Tree command implementation

use catalog_core::{EntityType, SortOrder};
use catalog_core::hierarchy::BrokenEdge;
use colored::Colorize;

use super::state_label;
use crate::context::{Context, parse_types_or};
use crate::error::Result;

/// Run the tree command
///
/// Shows the glossary unless `--type` names other types.
pub async fn run_tree(ctx: &Context, types: &[String], sorted: bool) -> Result<()> {
    let types = parse_types_or(types, &EntityType::GLOSSARY)?;
    let snapshot = ctx.reconciler().refresh(&types).await?;
    let order = if sorted {
        SortOrder::AllByName
    } else {
        ctx.config.root_order()
    };
    let forest = snapshot.forest(order);

    if forest.is_empty() {
        println!("{}", "No entities".dimmed());
        return Ok(());
    }

    for (depth, node) in forest.walk() {
        let classified = node.item();
        println!(
            "{}{} {} {}",
            "  ".repeat(depth),
            state_label(classified.state),
            classified.entity.name(),
            classified.entity.identity_key.dimmed()
        );
    }

    for edge in forest.broken_edges() {
        let line = match edge {
            BrokenEdge::Unresolved { key, parent_key } => {
                format!("{key}: parent {parent_key} not found, shown as a root")
            }
            BrokenEdge::Cycle { key, parent_key } => {
                format!("{key}: parent {parent_key} would form a cycle, shown as a root")
            }
        };
        println!("{} {}", "warning:".yellow().bold(), line);
    }

    Ok(())
}
