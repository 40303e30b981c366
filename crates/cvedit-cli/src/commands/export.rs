//! Export command handler

use std::path::Path;

use anyhow::Result;

use cvedit_core::Config;

use crate::output::Output;
use crate::render;

use super::open_editor;

/// Write the plain-text rendering of the résumé to `path`
pub fn export(config: &Config, path: &Path, output: &Output) -> Result<()> {
    let (editor, restored) = open_editor(config);
    render::export_to(editor.tree(), path)?;

    if !restored {
        output.message("No saved résumé, exporting the default");
    }
    output.success(&format!("Exported to {}", path.display()));
    Ok(())
}
