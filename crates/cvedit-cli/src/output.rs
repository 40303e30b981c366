//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use cvedit_core::{ContentTree, ProfileImage, ThemeColors};

use crate::render;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print the whole document
    ///
    /// `restored` tells whether it came from the saved record or is the
    /// built-in default.
    pub fn print_document(
        &self,
        tree: &ContentTree,
        theme: &ThemeColors,
        image: &ProfileImage,
        restored: bool,
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                print!("{}", render::plain_text(tree));
                println!();
                println!("── Theme ──");
                println!(
                    "primary {}  secondary {}  accent {}",
                    theme.primary, theme.secondary, theme.accent
                );
                println!(
                    "background {}  sidebar {}  text {}",
                    theme.background, theme.sidebar, theme.text
                );
                if image.is_present() {
                    println!(
                        "Photo: {} ({} bytes encoded)",
                        image.mime().unwrap_or("image"),
                        image.encoded_len()
                    );
                }
                if !restored {
                    println!();
                    println!("(no saved résumé, showing the default)");
                }
            }
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "source": if restored { "saved" } else { "default" },
                    "html": tree,
                    "colors": theme,
                    "profileImage": image,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Quiet => {
                for block in tree.iter().filter(|block| block.is_editable()) {
                    println!("{}\t{}", block.id, first_line(&block.text));
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// First line of a possibly multi-line value
fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}
