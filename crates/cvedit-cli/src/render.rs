//! Plain-text rendering of the résumé
//!
//! Used by `cvedit show`, `cvedit export` and the export shortcut in the
//! terminal editor.

use std::path::Path;

use anyhow::{Context, Result};
use cvedit_core::{Block, BlockKind, ContentTree};

const HEADING_ROLES: [&str; 2] = ["section-title", "sidebar-title"];

/// Render the document as indented plain text
pub fn plain_text(tree: &ContentTree) -> String {
    let mut out = String::new();

    for (block, depth) in tree.outline() {
        match block.kind {
            BlockKind::Field if HEADING_ROLES.contains(&block.role.as_str()) => {
                if !out.is_empty() {
                    out.push('\n');
                }
                let heading = block.text.to_uppercase();
                out.push_str(&heading);
                out.push('\n');
                out.push_str(&"─".repeat(heading.chars().count()));
                out.push('\n');
            }
            BlockKind::Field => {
                let indent = "  ".repeat(depth.saturating_sub(2));
                for line in block.text.lines() {
                    out.push_str(&indent);
                    out.push_str(line.trim_end());
                    out.push('\n');
                }
            }
            BlockKind::Section if block.role == "lang-dots" => {
                let indent = "  ".repeat(depth.saturating_sub(2));
                out.push_str(&indent);
                out.push_str(&level_gauge(block));
                out.push('\n');
            }
            BlockKind::Entry if !out.is_empty() && !out.ends_with("\n\n") => {
                out.push('\n');
            }
            _ => {}
        }
    }

    out
}

/// Filled and empty dots of a language level
fn level_gauge(dots: &Block) -> String {
    dots.children
        .iter()
        .filter(|marker| marker.kind == BlockKind::Marker)
        .map(|marker| if marker.filled { '●' } else { '○' })
        .collect()
}

/// Write the plain-text rendering to `path`
pub fn export_to(tree: &ContentTree, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(path, plain_text(tree))
        .with_context(|| format!("Failed to write export: {:?}", path))
}
