//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Catalog Sync - Reconcile local catalog metadata with a remote catalog
#[derive(Parser, Debug)]
#[command(name = "catalog-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace root (defaults to the nearest directory holding `.catalog/`)
    #[arg(long, global = true, env = "CATALOG_SYNC_ROOT")]
    pub root: Option<PathBuf>,

    /// Connection id for cached lookups (defaults to `connection.default`)
    #[arg(long, global = true)]
    pub connection: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Entity type selection shared by every command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeArgs {
    /// Entity types to load (repeatable; `glossary` selects nodes and terms)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub types: Vec<String>,
}

/// Targets and flags of a bulk command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TargetArgs {
    /// Identity keys to process, in order
    pub keys: Vec<String>,

    /// Also target every entity in this sync state
    #[arg(short, long)]
    pub state: Option<String>,

    #[command(flatten)]
    pub types: TypeArgs,

    /// Report what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output the job report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Initialize a `.catalog/` workspace with a default config.toml
    Init,

    /// Show every entity with its sync state
    Status {
        #[command(flatten)]
        types: TypeArgs,

        /// Only show entities in this sync state
        #[arg(short, long)]
        state: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the glossary as a parent/child tree
    Tree {
        #[command(flatten)]
        types: TypeArgs,

        /// Sort every level by name
        #[arg(long)]
        sorted: bool,
    },

    /// Push local entities to the remote catalog
    ///
    /// Examples:
    ///   catalog-sync push urn:li:tag:pii
    ///   catalog-sync push --state local-only --dry-run
    Push(TargetArgs),

    /// Pull remote entities into the local store
    Pull(TargetArgs),

    /// Delete entities from the local store
    DeleteLocal(TargetArgs),

    /// Delete entities from the remote catalog
    DeleteRemote(TargetArgs),

    /// Write review artifacts for entities to the staging directory
    Stage(TargetArgs),
}
