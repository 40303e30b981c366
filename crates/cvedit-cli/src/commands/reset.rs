//! Reset command handler

use std::io::{self, Write};

use anyhow::{Context, Result};

use cvedit_core::{Config, FileStorage, Storage};

use crate::output::Output;

/// Delete the saved record so the next start shows the default résumé
pub fn reset(config: &Config, yes: bool, output: &Output) -> Result<()> {
    let mut storage = FileStorage::new(&config.data_dir);
    let path = storage.path_for(&config.storage_key);

    if !path.exists() {
        output.message("Nothing saved, already at the default résumé");
        return Ok(());
    }

    if !yes && output.should_prompt() {
        print!("Delete {}? [y/N] ", path.display());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !matches!(input.trim(), "y" | "Y" | "yes") {
            output.message("Cancelled");
            return Ok(());
        }
    }

    storage
        .remove(&config.storage_key)
        .with_context(|| format!("Failed to delete {:?}", path))?;

    output.success("Saved résumé deleted");
    Ok(())
}
