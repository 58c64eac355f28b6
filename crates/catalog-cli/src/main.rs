//! Catalog Sync CLI
//!
//! Reconciles a local catalog workspace with its remote catalog mirror.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use catalog_core::BulkOperation;
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialise logging: {}", "warning".yellow().bold(), e);
    }
    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        println!("{} Catalog Sync CLI", "catalog-sync".green().bold());
        println!();
        println!("Run {} for available commands.", "catalog-sync --help".cyan());
        return Ok(());
    };

    if command == Commands::Init {
        let root = match cli.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        return commands::run_init(&root);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let ctx = Context::load(cli.root, cli.connection)?;
        execute_command(&ctx, command).await
    })
}

async fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init => commands::run_init(&ctx.root),
        Commands::Status { types, state, json } => {
            commands::run_status(ctx, &types.types, state.as_deref(), json).await
        }
        Commands::Tree { types, sorted } => commands::run_tree(ctx, &types.types, sorted).await,
        Commands::Push(args) => commands::run_bulk(ctx, BulkOperation::SyncToRemote, &args).await,
        Commands::Pull(args) => commands::run_bulk(ctx, BulkOperation::SyncToLocal, &args).await,
        Commands::DeleteLocal(args) => {
            commands::run_bulk(ctx, BulkOperation::DeleteLocal, &args).await
        }
        Commands::DeleteRemote(args) => {
            commands::run_bulk(ctx, BulkOperation::DeleteRemote, &args).await
        }
        Commands::Stage(args) => {
            commands::run_bulk(ctx, BulkOperation::StageForReview, &args).await
        }
    }
}
