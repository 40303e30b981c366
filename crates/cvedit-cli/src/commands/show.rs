//! Show command handler

use anyhow::Result;

use cvedit_core::Config;

use crate::output::Output;

use super::open_editor;

/// Print the saved résumé (or the default one)
pub fn show(config: &Config, output: &Output) -> Result<()> {
    let (editor, restored) = open_editor(config);
    output.print_document(
        editor.tree(),
        editor.theme(),
        editor.profile_image(),
        restored,
    )
}
