//! Shared test utilities for the catalog-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: git repository fixtures
//! - [`workspace`]: [`TestWorkspace`] builder for a `.catalog/` layout on disk

pub mod git;
pub mod workspace;

pub use workspace::TestWorkspace;
