//! Filesystem primitives for Catalog Sync
//!
//! Provides atomic writes, canonical checksums, normalized paths and
//! format-agnostic config loading for the layers above.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use constants::CatalogPath;
pub use error::{Error, Result};
pub use path::NormalizedPath;
