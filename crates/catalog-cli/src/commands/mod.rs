//! Command implementations for catalog-cli

pub mod bulk;
pub mod init;
pub mod status;
pub mod tree;

pub use bulk::run_bulk;
pub use init::run_init;
pub use status::run_status;
pub use tree::run_tree;

use catalog_core::SyncState;
use colored::{ColoredString, Colorize};

/// Sync state label, colored by severity
pub(crate) fn state_label(state: SyncState) -> ColoredString {
    let label = format!("{:<11}", state.as_str());
    match state {
        SyncState::Synced => label.green(),
        SyncState::Modified => label.yellow(),
        SyncState::LocalOnly => label.cyan(),
        SyncState::RemoteOnly => label.magenta(),
    }
}
