//! Init command implementation

use std::path::Path;

use catalog_core::ConfigResolver;
use catalog_fs::CatalogPath;
use colored::Colorize;

use crate::error::Result;

/// Create the `.catalog/` layout and a default config in `root`.
pub fn run_init(root: &Path) -> Result<()> {
    for dir in [CatalogPath::LocalStoreDir, CatalogPath::RemoteMirrorDir] {
        std::fs::create_dir_all(root.join(dir))?;
    }

    let wrote = ConfigResolver::new(root).write_default()?;
    if wrote {
        println!("{} {}", "Initialized".green().bold(), root.display());
        println!("  {}: {}", "Config".dimmed(), CatalogPath::ConfigFile);
    } else {
        println!(
            "{} {} already exists, left unchanged",
            "Skipped".yellow().bold(),
            CatalogPath::ConfigFile
        );
    }
    Ok(())
}
