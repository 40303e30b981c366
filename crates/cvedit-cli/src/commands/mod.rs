//! Command handlers

use std::time::Instant;

use cvedit_core::{Config, Editor};

pub mod config;
pub mod export;
pub mod reset;
pub mod show;

/// Editor over the saved record, or the default document if there is none
///
/// The flag tells whether a saved record was restored.
pub fn open_editor(config: &Config) -> (Editor, bool) {
    let mut editor = Editor::open(config);
    let restored = editor.load_on_startup(Instant::now());
    (editor, restored)
}
