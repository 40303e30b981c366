//! cvedit TUI
//!
//! Terminal editor for the résumé.
//!
//! ## Layout
//!
//! - Left: the document as an indented tree, one block per row
//! - Right: details of the selected block, history, autosave and theme
//! - Bottom: notifications, command or search input
//!
//! ## Editing
//!
//! - j/k or ↑/↓: Move selection
//! - Enter or click: Edit the selected field
//! - Enter / Tab: Confirm, Esc: Cancel
//! - m, then b/a: Move an entry before/after the selection (or drag it)
//! - d: Delete, u / Ctrl+Z: Undo, Ctrl+R / Ctrl+Y: Redo
//! - 1-5: Language level
//! - Ctrl+F or /: Search, Ctrl+S: Save, Ctrl+P: Export
//! - :: Command mode
//! - ?: Shortcuts, q: Quit

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cvedit_core::keymap::{self, Key, KeyChord, Modifiers};
use cvedit_core::{Config, Focus, Intent};

use app::{App, InputMode};

use crate::commands::open_editor;

/// Run the TUI application
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if CVEDIT_LOG is set)
    init_tui_logging(&config);

    let (editor, restored) = open_editor(&config);
    info!(restored, data_dir = ?config.data_dir, "editor opened");
    let mut app = App::new(editor, config.data_dir.join("resume.txt"));

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Run app
    let result = run_app(&mut terminal, &mut app).await;
    app.shutdown();

    // Restore terminal
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Check for status message timeout
        app.check_status_timeout();

        let size = terminal.size()?;
        let areas = ui::areas(Rect::new(0, 0, size.width, size.height));
        app.ensure_visible(areas.tree.height.saturating_sub(2) as usize);

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::time::sleep(Duration::from_millis(50)).await;

        // Autosave debounce and notification expiry
        app.tick();

        // Drain everything that queued up since the last frame
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        handle_key(app, key);
                    }
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse, areas.tree),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Translate a terminal key into the core's chord
fn to_chord(key: &KeyEvent) -> KeyChord {
    let chord_key = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        _ => Key::Other,
    };
    let modifiers = Modifiers {
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        meta: key.modifiers.intersects(KeyModifiers::SUPER | KeyModifiers::META),
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
        alt: key.modifiers.contains(KeyModifiers::ALT),
    };
    KeyChord::new(chord_key, modifiers)
}

/// Route one key press
fn handle_key(app: &mut App, key: KeyEvent) {
    if app.input_mode == InputMode::Command {
        handle_command_mode(app, key.code, key.modifiers);
        return;
    }

    // If help is showing, any key dismisses it
    if app.editor.is_shortcuts_open() {
        let intent = if key.code == KeyCode::Esc {
            Intent::Escape
        } else {
            Intent::ToggleShortcuts
        };
        app.dispatch(intent);
        return;
    }

    // Escape aborts a move before anything else
    if key.code == KeyCode::Esc && app.editor.reorder().is_active() {
        app.end_drag();
        app.set_status("Move cancelled");
        return;
    }

    let chord = to_chord(&key);
    let focus = app.editor.focus();
    if keymap::resolve(chord, focus).is_some() {
        app.dispatch(Intent::Key(chord));
        return;
    }

    if focus != Focus::None {
        handle_editing_mode(app, key.code, chord);
    } else if app.editor.is_search_active() {
        handle_search_mode(app, key.code);
    } else {
        handle_normal_mode(app, key.code, key.modifiers);
    }
}

/// Handle key events in normal mode
fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    // Clear status message on navigation keys
    if matches!(
        code,
        KeyCode::Char('j') | KeyCode::Char('k') | KeyCode::Up | KeyCode::Down
    ) {
        app.status_message = None;
    }

    match code {
        // Quit
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Navigation
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('g') | KeyCode::Home => app.move_to_first(),
        KeyCode::Char('G') | KeyCode::End => app.move_to_last(),

        // Editing
        KeyCode::Enter | KeyCode::Char('e') | KeyCode::Char('i') => app.edit_selected(),
        KeyCode::Char(c @ '1'..='5') => {
            if let Some(level) = c.to_digit(10) {
                app.set_level(level as usize);
            }
        }
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('u') => {
            app.dispatch(Intent::Undo);
        }
        KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.dispatch(Intent::Redo);
        }

        // Moving entries
        KeyCode::Char('m') => app.pick_up(),
        KeyCode::Char('b') => app.drop_at_selection(false),
        KeyCode::Char('a') => app.drop_at_selection(true),

        // Search
        KeyCode::Char('/') => {
            app.dispatch(Intent::ToggleSearch);
        }

        // Command mode
        KeyCode::Char(':') => app.enter_command_mode(),

        _ => {}
    }
}

/// Handle key events while a field is being edited
fn handle_editing_mode(app: &mut App, code: KeyCode, chord: KeyChord) {
    match code {
        // Leaving the field confirms it
        KeyCode::Tab | KeyCode::BackTab => {
            app.dispatch(Intent::Commit);
        }
        KeyCode::Char(_) | KeyCode::Enter | KeyCode::Backspace => {
            app.dispatch(Intent::Key(chord));
        }
        _ => {}
    }
}

/// Handle key events while search is active
fn handle_search_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Enter => app.next_match(),
        KeyCode::Char(c) => {
            app.search_text.push(c);
            if let Some(&first) = app.search_matches().first() {
                app.select(first);
            }
        }
        KeyCode::Backspace => {
            app.search_text.pop();
        }
        KeyCode::Up => app.move_up(),
        KeyCode::Down => app.move_down(),
        _ => {}
    }
}

/// Handle key events in command mode
fn handle_command_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        // Cancel command
        KeyCode::Esc => {
            app.exit_input_mode();
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.exit_input_mode();
        }

        // Execute command
        KeyCode::Enter => {
            let result = app.execute_command();
            app.exit_input_mode();
            if let Err(e) = result {
                app.set_status(format!("Command failed: {:#}", e));
            }
        }

        // Text input
        KeyCode::Char(c) => {
            app.insert_char(c);
        }
        KeyCode::Backspace => {
            app.delete_char();
        }
        KeyCode::Left => {
            app.cursor_left();
        }
        KeyCode::Right => {
            app.cursor_right();
        }

        _ => {}
    }
}

/// Handle mouse events over the tree pane
fn handle_mouse(app: &mut App, mouse: MouseEvent, tree: Rect) {
    if app.input_mode == InputMode::Command || app.editor.is_shortcuts_open() {
        return;
    }
    let row = ui::row_at(app, tree, mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(row),
        MouseEventKind::ScrollUp => app.move_up(),
        MouseEventKind::ScrollDown => app.move_down(),
        _ => {}
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if CVEDIT_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_tui_logging(config: &Config) {
    // Only log if CVEDIT_LOG is set
    let Ok(log_level) = std::env::var("CVEDIT_LOG") else {
        return;
    };

    let log_path = config.log_path();

    // Create log file
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "cvedit_core={},cvedit_cli={}",
        log_level, log_level
    ));

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use cvedit_core::{BlockId, Editor, EditorSettings, MemoryStorage};
    use std::path::PathBuf;

    fn app() -> App {
        let editor = Editor::new(Box::new(MemoryStorage::new()), EditorSettings::default());
        App::new(editor, PathBuf::from("cv.txt"))
    }

    fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
        handle_key(
            app,
            KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                state: KeyEventState::NONE,
            },
        );
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    fn select(app: &mut App, id: &str) {
        let index = app.rows.iter().position(|r| r.id.as_str() == id).unwrap();
        app.select(index);
    }

    #[test]
    fn test_to_chord() {
        let key = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        let chord = to_chord(&key);
        assert_eq!(chord.key, Key::Char('z'));
        assert!(chord.modifiers.ctrl && chord.modifiers.shift);
        assert!(!chord.modifiers.meta);

        assert_eq!(to_chord(&KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE)).key, Key::Other);
    }

    #[test]
    fn test_edit_with_keys() {
        let mut app = app();
        select(&mut app, "headline");

        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.editor.focus(), Focus::SingleLine);

        // Clear the seeded value, then type a new one
        for _ in 0.."Ingénieure logiciel".chars().count() {
            press(&mut app, KeyCode::Backspace, KeyModifiers::NONE);
        }
        type_str(&mut app, "Staff qa");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

        let headline = app.editor.tree().find(&BlockId::new("headline")).unwrap();
        assert_eq!(headline.text, "Staff qa");
        assert_eq!(app.editor.focus(), Focus::None);

        // 'q' typed into a field must not quit
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Char('z'), KeyModifiers::CONTROL);
        let headline = app.editor.tree().find(&BlockId::new("headline")).unwrap();
        assert_eq!(headline.text, "Ingénieure logiciel");
    }

    #[test]
    fn test_tab_confirms_multiline() {
        let mut app = app();
        select(&mut app, "intro");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.editor.focus(), Focus::MultiLine);

        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.editor.focus(), Focus::MultiLine);
        press(&mut app, KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.editor.focus(), Focus::None);
    }

    #[test]
    fn test_help_overlay_any_key_closes() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert!(app.editor.is_shortcuts_open());

        press(&mut app, KeyCode::Char('j'), KeyModifiers::NONE);
        assert!(!app.editor.is_shortcuts_open());
    }

    #[test]
    fn test_escape_cancels_move_first() {
        let mut app = app();
        select(&mut app, "education-1");
        press(&mut app, KeyCode::Char('m'), KeyModifiers::NONE);
        assert!(app.editor.reorder().is_active());

        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.editor.reorder().is_active());
    }

    #[test]
    fn test_search_mode_typing() {
        let mut app = app();
        press(&mut app, KeyCode::Char('f'), KeyModifiers::CONTROL);
        assert!(app.editor.is_search_active());

        type_str(&mut app, "nimbus");
        assert_eq!(app.selected_id().unwrap().as_str(), "experience-1-company");
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.editor.is_search_active());
        assert!(app.search_text.is_empty());
    }

    #[test]
    fn test_command_mode_roundtrip() {
        let mut app = app();
        press(&mut app, KeyCode::Char(':'), KeyModifiers::NONE);
        assert_eq!(app.input_mode, InputMode::Command);

        type_str(&mut app, "preset dark");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.editor.theme().background, "#2c3e50");
    }
}
