//! Git integration for Catalog Sync
//!
//! Staged-change artifacts are written into a repository work tree and added
//! to the index so they can be reviewed and committed outside this tool.

pub mod error;
pub mod staging;

pub use error::{Error, Result};
pub use staging::StagingArea;
