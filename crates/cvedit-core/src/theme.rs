//! Theme colors and the profile image
//!
//! Neither is part of the document tree: they are persisted alongside it
//! but never snapshotted, so undo does not touch them.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::EditError;

/// Names of the built-in presets
pub const PRESET_NAMES: [&str; 5] = ["blue", "green", "red", "purple", "dark"];

/// The six named colors, as `#rrggbb` strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub sidebar: String,
    pub text: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        palette("#3498db", "#2c3e50", "#4a5f7f", "#ffffff", "#fafafa", "#444444")
    }
}

fn palette(
    primary: &str,
    secondary: &str,
    accent: &str,
    background: &str,
    sidebar: &str,
    text: &str,
) -> ThemeColors {
    ThemeColors {
        primary: primary.to_string(),
        secondary: secondary.to_string(),
        accent: accent.to_string(),
        background: background.to_string(),
        sidebar: sidebar.to_string(),
        text: text.to_string(),
    }
}

impl ThemeColors {
    /// Look up a built-in preset by name
    pub fn preset(name: &str) -> Option<Self> {
        let colors = match name {
            "blue" => Self::default(),
            "green" => palette("#27ae60", "#2c3e50", "#3d7e5a", "#ffffff", "#f8fcf9", "#444444"),
            "red" => palette("#e74c3c", "#2c3e50", "#a8433a", "#ffffff", "#fdf8f7", "#444444"),
            "purple" => palette("#9b59b6", "#2c3e50", "#7a4b8c", "#ffffff", "#faf7fc", "#444444"),
            "dark" => palette("#3498db", "#34495e", "#2c3e50", "#2c3e50", "#34495e", "#ecf0f1"),
            _ => return None,
        };
        Some(colors)
    }

    pub fn get(&self, slot: ColorSlot) -> &str {
        match slot {
            ColorSlot::Primary => &self.primary,
            ColorSlot::Secondary => &self.secondary,
            ColorSlot::Accent => &self.accent,
            ColorSlot::Background => &self.background,
            ColorSlot::Sidebar => &self.sidebar,
            ColorSlot::Text => &self.text,
        }
    }

    /// Set one color; the value must be `#rgb` or `#rrggbb`
    pub fn set(&mut self, slot: ColorSlot, value: &str) -> Result<(), EditError> {
        let value = value.trim();
        if !is_hex_color(value) {
            return Err(EditError::InvalidColor(value.to_string()));
        }
        let value = value.to_ascii_lowercase();
        match slot {
            ColorSlot::Primary => self.primary = value,
            ColorSlot::Secondary => self.secondary = value,
            ColorSlot::Accent => self.accent = value,
            ColorSlot::Background => self.background = value,
            ColorSlot::Sidebar => self.sidebar = value,
            ColorSlot::Text => self.text = value,
        }
        Ok(())
    }

    /// Parse one color into RGB components
    pub fn rgb(&self, slot: ColorSlot) -> Option<(u8, u8, u8)> {
        parse_hex(self.get(slot))
    }
}

fn is_hex_color(value: &str) -> bool {
    parse_hex(value).is_some()
}

fn parse_hex(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|d| d * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

/// One of the six named colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSlot {
    Primary,
    Secondary,
    Accent,
    Background,
    Sidebar,
    Text,
}

impl ColorSlot {
    pub const ALL: [ColorSlot; 6] = [
        ColorSlot::Primary,
        ColorSlot::Secondary,
        ColorSlot::Accent,
        ColorSlot::Background,
        ColorSlot::Sidebar,
        ColorSlot::Text,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorSlot::Primary => "primary",
            ColorSlot::Secondary => "secondary",
            ColorSlot::Accent => "accent",
            ColorSlot::Background => "background",
            ColorSlot::Sidebar => "sidebar",
            ColorSlot::Text => "text",
        }
    }
}

impl fmt::Display for ColorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorSlot::ALL
            .into_iter()
            .find(|slot| slot.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown color '{s}' (expected one of: primary, secondary, accent, background, sidebar, text)"))
    }
}

/// Profile picture stored as a data URI, or empty
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileImage(String);

impl ProfileImage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a stored value as-is
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Build a data URI from raw image bytes
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Read an image file and encode it
    pub fn from_file(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let Some(mime) = mime_for_extension(&extension) else {
            bail!("Not a supported image file: {}", path.display());
        };
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;
        Ok(Self::from_bytes(mime, &bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only a real uploaded image counts, not any non-empty value
    pub fn is_present(&self) -> bool {
        self.0.starts_with("data:image/")
    }

    /// MIME type of the encoded image
    pub fn mime(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        rest.split_once(';').map(|(mime, _)| mime)
    }

    /// Size of the encoded payload in bytes
    pub fn encoded_len(&self) -> usize {
        self.0
            .split_once(',')
            .map(|(_, payload)| payload.len())
            .unwrap_or(0)
    }
}

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_presets() {
        for name in PRESET_NAMES {
            assert!(ThemeColors::preset(name).is_some(), "missing preset {name}");
        }
        assert!(ThemeColors::preset("neon").is_none());

        let dark = ThemeColors::preset("dark").unwrap();
        assert_eq!(dark.background, "#2c3e50");
        assert_eq!(dark.text, "#ecf0f1");
        assert_eq!(ThemeColors::preset("blue").unwrap(), ThemeColors::default());
    }

    #[test]
    fn test_set_color_validates_hex() {
        let mut colors = ThemeColors::default();

        colors.set(ColorSlot::Accent, "#ABCDEF").unwrap();
        assert_eq!(colors.accent, "#abcdef");

        colors.set(ColorSlot::Text, "#fff").unwrap();
        assert_eq!(colors.rgb(ColorSlot::Text), Some((255, 255, 255)));

        let err = colors.set(ColorSlot::Primary, "blue").unwrap_err();
        assert_eq!(err, EditError::InvalidColor("blue".to_string()));
        assert!(colors.set(ColorSlot::Primary, "#12345g").is_err());
        assert_eq!(colors.primary, "#3498db");
    }

    #[test]
    fn test_color_slot_from_str() {
        assert_eq!("Sidebar".parse::<ColorSlot>().unwrap(), ColorSlot::Sidebar);
        assert!("border".parse::<ColorSlot>().is_err());
    }

    #[test]
    fn test_profile_image_presence() {
        assert!(!ProfileImage::empty().is_present());
        assert!(!ProfileImage::from_uri("https://example.com/me.png").is_present());

        let image = ProfileImage::from_bytes("image/png", &[1, 2, 3]);
        assert!(image.is_present());
        assert_eq!(image.mime(), Some("image/png"));
        assert_eq!(image.as_str(), "data:image/png;base64,AQID");
        assert_eq!(image.encoded_len(), 4);
    }

    #[test]
    fn test_profile_image_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("me.JPG");
        std::fs::write(&path, b"jpegbytes").unwrap();

        let image = ProfileImage::from_file(&path).unwrap();
        assert_eq!(image.mime(), Some("image/jpeg"));

        let text = temp_dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(ProfileImage::from_file(&text).is_err());
        assert!(ProfileImage::from_file(&temp_dir.path().join("missing.png")).is_err());
    }
}
