//! Bulk command implementation
//!
//! Runs one [`BulkJob`] over the given targets, printing progress to stderr
//! while it runs and a per-item report afterwards. Ctrl-C cancels the job
//! between items.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use catalog_core::bulk::Progress;
use catalog_core::{BulkJob, BulkOperation, ItemStatus, SyncState};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::cli::TargetArgs;
use crate::context::{Context, parse_types, require_targets};
use crate::error::{CliError, Result};

/// Run a bulk command
pub async fn run_bulk(ctx: &Context, operation: BulkOperation, args: &TargetArgs) -> Result<()> {
    let types = parse_types(&args.types.types)?;
    let reconciler = ctx.reconciler();

    let mut targets = args.keys.clone();
    if let Some(state) = args.state.as_deref() {
        let state: SyncState = state.parse()?;
        let snapshot = reconciler.refresh(&types).await?;
        targets.extend(snapshot.filter(state).map(|e| e.entity.identity_key.clone()));
    }
    require_targets(&targets)?;

    let job = BulkJob::new(operation, types, targets);
    let handler = ctx.handler(args.dry_run)?;
    let coordinator = ctx.coordinator();

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling remaining items");
                cancel.cancel();
            }
        }
    });

    let printed = Arc::new(AtomicUsize::new(0));
    let watcher = (!args.json).then(|| {
        let mut progress = job.subscribe();
        let printed = Arc::clone(&printed);
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let current = *progress.borrow_and_update();
                print_progress(&current, &printed);
            }
        })
    });

    let job = coordinator.run(job, &reconciler, &handler, &cancel).await;
    interrupt.abort();
    if let Some(watcher) = watcher {
        watcher.abort();
        print_progress(&job.progress(), &printed);
    }

    let summary = job.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&job.report())?);
    } else {
        print_report(&job, args.dry_run);
    }

    if summary.failed_count > 0 {
        return Err(CliError::JobFailed {
            failed: summary.failed_count,
            total: job.targets().len(),
        });
    }
    Ok(())
}

fn print_progress(progress: &Progress, printed: &AtomicUsize) {
    if progress.processed == 0 {
        return;
    }
    if printed.fetch_max(progress.processed, Ordering::SeqCst) < progress.processed {
        eprintln!("{}", progress.to_string().dimmed());
    }
}

fn print_report(job: &BulkJob, dry_run: bool) {
    let title = format!("{} ({})", job.operation().command_name(), job.operation());
    if dry_run {
        println!("{} {}", title.bold(), "[dry run]".yellow());
    } else {
        println!("{}", title.bold());
    }
    println!();

    for result in job.results() {
        match result.status {
            ItemStatus::Succeeded => {
                let detail = match (&result.message, result.artifact_names.is_empty()) {
                    (Some(message), _) => message.clone(),
                    (None, false) => result.artifact_names.join(", "),
                    (None, true) => String::new(),
                };
                println!("  {} {} {}", "OK".green(), result.identity_key, detail.dimmed());
            }
            ItemStatus::Failed => {
                let (kind, message) = result
                    .failure
                    .as_ref()
                    .map(|f| (f.kind.as_str(), f.message.as_str()))
                    .unwrap_or(("unknown", ""));
                println!(
                    "  {} {} {}: {}",
                    "FAILED".red(),
                    result.identity_key,
                    kind.red(),
                    message
                );
            }
            ItemStatus::Cancelled => {
                println!("  {} {}", "CANCELLED".dimmed(), result.identity_key);
            }
        }
    }

    let summary = job.summary();
    println!();
    println!(
        "{} succeeded, {} failed, {} cancelled",
        summary.succeeded_count.to_string().green(),
        summary.failed_count.to_string().red(),
        summary.cancelled_count,
    );
    if summary.retryable_count > 0 {
        println!(
            "{} failed item(s) can be retried",
            summary.retryable_count.to_string().yellow()
        );
    }
}
