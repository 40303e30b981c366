//! Application state and logic

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use cvedit_core::{
    Block, BlockId, BlockKind, ColorSlot, Dispatch, Editor, Intent, ProfileImage, TemplateKind,
};

use crate::render;

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Tree navigation, inline editing and search
    Normal,
    /// Command input mode (after pressing :)
    Command,
}

/// One line of the tree view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: BlockId,
    pub depth: usize,
}

/// Mouse button held down on a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MousePress {
    pub source: BlockId,
    pub row: usize,
}

/// Application state
pub struct App {
    /// The editing core
    pub editor: Editor,
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Command input buffer
    pub command_input: String,
    /// Cursor position in command input
    pub command_cursor: usize,
    /// Visible rows (markers are folded into their gauge)
    pub rows: Vec<Row>,
    /// Currently selected row index
    pub selected: usize,
    /// First row shown in the tree pane
    pub scroll: usize,
    /// Text typed while search is active
    pub search_text: String,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Where exports go
    pub export_path: PathBuf,
    /// Left button held on a draggable row
    pub mouse_press: Option<MousePress>,
    /// Drop zone under the pointer or selection during a drag
    pub hover: Option<BlockId>,
    /// Editor render epoch the rows were built from
    rows_epoch: Option<u64>,
}

impl App {
    pub fn new(editor: Editor, export_path: PathBuf) -> Self {
        let mut app = Self {
            editor,
            should_quit: false,
            input_mode: InputMode::Normal,
            command_input: String::new(),
            command_cursor: 0,
            rows: Vec::new(),
            selected: 0,
            scroll: 0,
            search_text: String::new(),
            status_message: None,
            status_message_time: None,
            export_path,
            mouse_press: None,
            hover: None,
            rows_epoch: None,
        };
        app.refresh();
        app
    }

    /// Rebuild the rows if the document changed, keeping the selection
    pub fn refresh(&mut self) {
        if !self.editor.is_search_active() && !self.search_text.is_empty() {
            self.search_text.clear();
        }

        let epoch = self.editor.render_epoch();
        if self.rows_epoch == Some(epoch) {
            return;
        }
        self.rows_epoch = Some(epoch);

        let previous = self.selected_id().cloned();
        self.rows = self
            .editor
            .tree()
            .outline()
            .into_iter()
            .filter(|(block, _)| block.kind != BlockKind::Marker)
            .map(|(block, depth)| Row {
                id: block.id.clone(),
                depth,
            })
            .collect();

        if let Some(index) = previous.and_then(|id| self.rows.iter().position(|row| row.id == id)) {
            self.selected = index;
        }
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    /// Dispatch an intent to the core and follow up on the result
    pub fn dispatch(&mut self, intent: Intent) -> Dispatch {
        let outcome = self.editor.dispatch(intent, Instant::now());
        if outcome == Dispatch::ExportRequested {
            self.export();
        }
        self.refresh();
        outcome
    }

    /// Advance the core's timers
    pub fn tick(&mut self) {
        self.editor.tick(Instant::now());
        self.refresh();
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn selected_id(&self) -> Option<&BlockId> {
        self.rows.get(self.selected).map(|row| &row.id)
    }

    pub fn selected_block(&self) -> Option<&Block> {
        self.selected_id().and_then(|id| self.editor.tree().find(id))
    }

    /// Move selection up
    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.select(self.selected - 1);
        }
    }

    /// Move selection down
    pub fn move_down(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.select(self.selected + 1);
        }
    }

    pub fn move_to_first(&mut self) {
        self.select(0);
    }

    pub fn move_to_last(&mut self) {
        self.select(self.rows.len().saturating_sub(1));
    }

    /// Select a row; during a drag the selection is the drop candidate
    pub fn select(&mut self, index: usize) {
        if index >= self.rows.len() {
            return;
        }
        self.selected = index;
        if self.editor.reorder().is_active() {
            let zone = self.rows[index].id.clone();
            self.hover_zone(Some(zone));
        }
    }

    /// Keep the selected row inside a viewport of `height` rows
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + height {
            self.scroll = self.selected + 1 - height;
        }
    }

    /// Open the inline editor on the selected field
    pub fn edit_selected(&mut self) {
        let Some(block) = self.selected_block() else {
            return;
        };
        if block.is_editable() {
            let id = block.id.clone();
            self.dispatch(Intent::StartEdit(id));
        } else if block.role == "lang-dots" {
            self.set_status("Press 1-5 to set the level");
        } else {
            self.set_status("Not an editable field");
        }
    }

    /// Language entry enclosing the selected row
    pub fn selected_language(&self) -> Option<BlockId> {
        let id = self.selected_id()?;
        self.editor
            .tree()
            .enclosing(id, |block| block.kind == BlockKind::Entry && block.role == "language")
            .map(|block| block.id.clone())
    }

    /// Set the level of the selected language
    pub fn set_level(&mut self, level: usize) {
        let Some(language) = self.selected_language() else {
            self.set_status("Select a language first");
            return;
        };
        match self.editor.level_dot(&language, level) {
            Some(dot) => {
                self.dispatch(Intent::SetLanguageLevel(dot));
            }
            None => self.set_status(format!("Level must be between 1 and 5, got {}", level)),
        }
    }

    /// Start moving the selected entry
    pub fn pick_up(&mut self) {
        let Some(id) = self.selected_id().cloned() else {
            return;
        };
        if self.dispatch(Intent::DragStart(id.clone())) == Dispatch::Applied {
            self.set_status(format!("Moving {}: b = before, a = after, Esc = cancel", id));
        } else {
            self.set_status("Only entries can be moved");
        }
    }

    /// Drop the moving entry next to the selected block
    pub fn drop_at_selection(&mut self, after: bool) {
        if !self.editor.reorder().is_active() {
            self.set_status("Nothing to move, press m on an entry first");
            return;
        }
        let Some(zone) = self.selected_id().cloned() else {
            return;
        };
        let offset_y = if after { 1.0 } else { 0.0 };
        let outcome = self.dispatch(Intent::Drop {
            zone,
            offset_y,
            height: 1.0,
        });
        self.end_drag();
        if outcome == Dispatch::Unchanged {
            self.set_status("Nothing moved");
        }
    }

    /// Abort or finish a drag
    pub fn end_drag(&mut self) {
        self.hover_zone(None);
        self.mouse_press = None;
        self.dispatch(Intent::DragEnd);
    }

    /// Move the drag affordance to `zone`
    fn hover_zone(&mut self, zone: Option<BlockId>) {
        if self.hover == zone {
            return;
        }
        if let Some(old) = self.hover.take() {
            self.dispatch(Intent::DragLeave(old));
        }
        if let Some(zone) = zone {
            self.dispatch(Intent::DragEnter(zone.clone()));
            if self.dispatch(Intent::DragOver(zone.clone())) == Dispatch::Applied {
                self.hover = Some(zone);
            }
        }
    }

    /// Left button pressed on a row, or outside the tree for `None`
    pub fn mouse_down(&mut self, row: Option<usize>) {
        let target = row.and_then(|index| self.rows.get(index)).map(|r| r.id.clone());
        if let Some(index) = row {
            self.selected = index;
        }

        self.mouse_press = match (&target, row) {
            (Some(id), Some(index))
                if self.editor.tree().find(id).is_some_and(|b| b.is_draggable()) =>
            {
                Some(MousePress {
                    source: id.clone(),
                    row: index,
                })
            }
            _ => None,
        };
        self.dispatch(Intent::PointerDown { target });
    }

    /// Pointer moved with the left button held
    pub fn mouse_drag(&mut self, row: Option<usize>) {
        let Some(press) = self.mouse_press.clone() else {
            return;
        };
        if !self.editor.reorder().is_active()
            && self.dispatch(Intent::DragStart(press.source)) != Dispatch::Applied
        {
            self.mouse_press = None;
            return;
        }
        let zone = row.and_then(|index| self.rows.get(index)).map(|r| r.id.clone());
        self.hover_zone(zone);
    }

    /// Left button released
    ///
    /// A terminal row has no height to split, so dragging upward inserts
    /// before the target and dragging downward inserts after it.
    pub fn mouse_up(&mut self, row: Option<usize>) {
        let Some(press) = self.mouse_press.take() else {
            return;
        };
        if !self.editor.reorder().is_active() {
            return;
        }
        if let Some(index) = row {
            if let Some(zone) = self.rows.get(index).map(|r| r.id.clone()) {
                let offset_y = if index < press.row { 0.25 } else { 0.75 };
                self.dispatch(Intent::Drop {
                    zone,
                    offset_y,
                    height: 1.0,
                });
            }
        }
        self.end_drag();
    }

    /// Delete the selected block; top-level columns stay
    pub fn delete_selected(&mut self) {
        let Some(row) = self.rows.get(self.selected) else {
            return;
        };
        if row.depth == 0 {
            self.set_status("Top-level sections cannot be deleted");
            return;
        }
        let id = row.id.clone();
        self.dispatch(Intent::Delete(id));
    }

    /// Rows whose text contains the search text
    pub fn search_matches(&self) -> Vec<usize> {
        if self.search_text.is_empty() {
            return Vec::new();
        }
        let needle = self.search_text.to_lowercase();
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                self.editor
                    .tree()
                    .find(&row.id)
                    .is_some_and(|block| block.text.to_lowercase().contains(&needle))
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Select the next search match after the current row, wrapping
    pub fn next_match(&mut self) {
        let matches = self.search_matches();
        let next = matches
            .iter()
            .copied()
            .find(|&index| index > self.selected)
            .or_else(|| matches.first().copied());
        match next {
            Some(index) => self.select(index),
            None => self.set_status(format!("No match for '{}'", self.search_text)),
        }
    }

    /// Write the plain-text export
    pub fn export(&mut self) {
        let path = self.export_path.clone();
        match render::export_to(self.editor.tree(), &path) {
            Ok(()) => self.set_status(format!("Exported to {}", path.display())),
            Err(e) => self.set_status(format!("Export failed: {:#}", e)),
        }
    }

    /// Enter command mode
    pub fn enter_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.command_input.clear();
        self.command_cursor = 0;
    }

    /// Exit command mode
    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.command_input.clear();
        self.command_cursor = 0;
    }

    /// Insert character at cursor position
    pub fn insert_char(&mut self, c: char) {
        let byte = byte_index(&self.command_input, self.command_cursor);
        self.command_input.insert(byte, c);
        self.command_cursor += 1;
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.command_cursor > 0 {
            self.command_cursor -= 1;
            let byte = byte_index(&self.command_input, self.command_cursor);
            self.command_input.remove(byte);
        }
    }

    /// Move cursor left
    pub fn cursor_left(&mut self) {
        if self.command_cursor > 0 {
            self.command_cursor -= 1;
        }
    }

    /// Move cursor right
    pub fn cursor_right(&mut self) {
        if self.command_cursor < self.command_input.chars().count() {
            self.command_cursor += 1;
        }
    }

    /// Parse and execute command from input
    pub fn execute_command(&mut self) -> anyhow::Result<()> {
        let input = self.command_input.trim().to_string();
        let (command, arg) = match input.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (input.as_str(), ""),
        };

        match command {
            "" => {}
            "add" => match arg.parse::<TemplateKind>() {
                Ok(template) => {
                    let anchor = self.selected_id().cloned();
                    self.dispatch(Intent::Add { template, anchor });
                }
                Err(e) => self.set_status(format!(
                    "{}. Types: {}",
                    e,
                    TemplateKind::ALL.map(|kind| kind.name()).join(", ")
                )),
            },
            "delete" | "d" => self.delete_selected(),
            "preset" | "theme" => {
                self.dispatch(Intent::ApplyPreset(arg.to_string()));
            }
            "color" => {
                let (slot, value) = arg.split_once(' ').unwrap_or((arg, ""));
                let slot: ColorSlot = slot.parse().map_err(anyhow::Error::msg)?;
                self.dispatch(Intent::SetColor {
                    slot,
                    value: value.trim().to_string(),
                });
            }
            "image" => {
                if arg.is_empty() {
                    self.set_status("Usage: image <path>");
                } else {
                    let image = ProfileImage::from_file(&expand_home(arg))?;
                    self.dispatch(Intent::SetProfileImage(image));
                }
            }
            "noimage" => {
                self.dispatch(Intent::RemoveProfileImage);
            }
            "translate" | "lang" => {
                self.dispatch(Intent::Translate(arg.to_string()));
            }
            "level" => match arg.parse::<usize>() {
                Ok(level) => self.set_level(level),
                Err(_) => self.set_status("Usage: level <1-5>"),
            },
            "reset" => {
                self.dispatch(Intent::Reset);
            }
            "save" | "w" => {
                self.dispatch(Intent::SaveNow);
            }
            "export" => {
                if !arg.is_empty() {
                    self.export_path = expand_home(arg);
                }
                self.dispatch(Intent::Export);
            }
            "undo" => {
                self.dispatch(Intent::Undo);
            }
            "redo" => {
                self.dispatch(Intent::Redo);
            }
            "help" => {
                self.dispatch(Intent::ToggleShortcuts);
            }
            "quit" | "q" => self.should_quit = true,
            "wq" => {
                self.dispatch(Intent::SaveNow);
                self.should_quit = true;
            }
            other => self.set_status(format!("Unknown command: {}", other)),
        }

        Ok(())
    }

    /// Close the open edit and flush a pending save before exiting
    pub fn shutdown(&mut self) {
        if !self.editor.session().is_idle() && self.dispatch(Intent::Commit) != Dispatch::Applied {
            self.dispatch(Intent::Cancel);
        }
        if self.editor.persistence().is_pending() {
            self.dispatch(Intent::SaveNow);
        }
    }
}

/// Byte offset of the `chars`-th character
fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

/// Expand a leading `~/`
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}
