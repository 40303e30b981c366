//! UI rendering

use std::time::Instant;

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use cvedit_core::keymap::SHORTCUTS;
use cvedit_core::{Block as DocBlock, BlockKind, ColorSlot, Focus};

use super::app::{App, InputMode, Row};

/// Areas of the screen
pub struct Areas {
    pub tree: Rect,
    pub detail: Rect,
    pub status: Rect,
}

/// Split the screen; shared by drawing and mouse hit-testing
pub fn areas(area: Rect) -> Areas {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(outer_chunks[0]);

    Areas {
        tree: pane_chunks[0],
        detail: pane_chunks[1],
        status: outer_chunks[1],
    }
}

/// Row index under a screen position, if any
pub fn row_at(app: &App, tree: Rect, column: u16, row: u16) -> Option<usize> {
    let inside_x = column > tree.x && column + 1 < tree.x + tree.width;
    let inside_y = row > tree.y && row + 1 < tree.y + tree.height;
    if !inside_x || !inside_y {
        return None;
    }
    let index = app.scroll + (row - tree.y - 1) as usize;
    (index < app.rows.len()).then_some(index)
}

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    let areas = areas(frame.area());

    draw_tree_pane(frame, app, areas.tree);
    draw_detail_pane(frame, app, areas.detail);

    match app.input_mode {
        InputMode::Normal if app.editor.is_search_active() => {
            draw_search_input(frame, app, areas.status)
        }
        InputMode::Normal => draw_status_bar(frame, app, areas.status),
        InputMode::Command => draw_command_input(frame, app, areas.status),
    }

    if app.editor.is_shortcuts_open() {
        draw_help_overlay(frame);
    }
}

fn theme_color(app: &App, slot: ColorSlot) -> Color {
    app.editor
        .theme()
        .rgb(slot)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Reset)
}

/// Draw the document tree (left)
fn draw_tree_pane(frame: &mut Frame, app: &App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let matches = app.search_matches();

    let lines: Vec<Line> = app
        .rows
        .iter()
        .enumerate()
        .skip(app.scroll)
        .take(height)
        .filter_map(|(index, row)| {
            let block = app.editor.tree().find(&row.id)?;
            let mut line = row_line(app, row, block);
            if matches.contains(&index) {
                line = line.style(Style::default().bg(Color::Yellow).fg(Color::Black));
            }
            if index == app.selected {
                line = line.patch_style(Style::default().add_modifier(Modifier::REVERSED));
            }
            Some(line)
        })
        .collect();

    let title = if app.editor.reorder().is_active() {
        " Résumé (moving) "
    } else {
        " Résumé "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme_color(app, ColorSlot::Primary)));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// One line of the tree
fn row_line<'a>(app: &'a App, row: &Row, block: &'a DocBlock) -> Line<'a> {
    let indent = Span::raw("  ".repeat(row.depth));
    let dim = Style::default().add_modifier(Modifier::DIM);

    match block.kind {
        BlockKind::Field if block.editing => {
            let buffer = app
                .editor
                .session()
                .active()
                .map(|active| active.buffer().replace('\n', " ⏎ "))
                .unwrap_or_default();
            Line::from(vec![
                indent,
                Span::styled(buffer, Style::default().fg(Color::Yellow)),
                Span::styled("▏", Style::default().fg(Color::Yellow)),
            ])
        }
        BlockKind::Field => {
            let mut text = block.text.lines().next().unwrap_or("").to_string();
            if block.text.lines().nth(1).is_some() {
                text.push_str(" …");
            }
            let style = match block.role.as_str() {
                "section-title" | "sidebar-title" => Style::default()
                    .fg(theme_color(app, ColorSlot::Primary))
                    .add_modifier(Modifier::BOLD),
                "name" => Style::default().add_modifier(Modifier::BOLD),
                _ => Style::default(),
            };
            Line::from(vec![indent, Span::styled(text, style)])
        }
        BlockKind::Section if block.role == "lang-dots" => {
            let gauge: String = block
                .children
                .iter()
                .filter(|marker| marker.kind == BlockKind::Marker)
                .map(|marker| if marker.filled { '●' } else { '○' })
                .collect();
            Line::from(vec![
                indent,
                Span::styled(gauge, Style::default().fg(theme_color(app, ColorSlot::Accent))),
            ])
        }
        BlockKind::Section => Line::from(vec![indent, Span::styled(format!("▾ {}", block.role), dim)]),
        BlockKind::Entry => {
            let mut spans = vec![indent, Span::styled(format!("• {}", block.role), dim)];
            if app.editor.reorder().is_dragging(&block.id) {
                spans.push(Span::styled("  ⇅ moving", Style::default().fg(Color::Cyan)));
            }
            if app.editor.reorder().is_drag_over(&block.id) {
                spans.push(Span::styled("  ◂ drop here", Style::default().fg(Color::Green)));
            }
            Line::from(spans)
        }
        BlockKind::Marker => Line::from(indent),
    }
}

/// Draw details of the selection, history, saving and theme (right)
fn draw_detail_pane(frame: &mut Frame, app: &App, area: Rect) {
    let editor = &app.editor;
    let mut content: Vec<Line> = Vec::new();
    let label = Style::default().add_modifier(Modifier::DIM);

    if let Some(block) = app.selected_block() {
        content.push(Line::from(vec![
            Span::styled("Block: ", label),
            Span::raw(block.id.to_string()),
        ]));
        content.push(Line::from(vec![
            Span::styled("Kind:  ", label),
            Span::raw(format!("{:?} ({})", block.kind, block.role)),
        ]));
        if block.is_editable() {
            content.push(Line::from(""));
            for text_line in block.text.lines() {
                content.push(Line::from(text_line.to_string()));
            }
        }
        content.push(Line::from(""));
    }

    let history = editor.history();
    content.push(Line::from(vec![
        Span::styled("History: ", label),
        Span::raw(format!(
            "{} undo / {} redo (max {})",
            history.undo_depth(),
            history.redo_depth(),
            history.max_depth()
        )),
    ]));

    let saving = if editor.persistence().is_pending() {
        "changes pending…".to_string()
    } else if let Some(saved) = editor.persistence().last_saved() {
        format!("saved {}", saved.with_timezone(&Local).format("%H:%M:%S"))
    } else {
        "nothing saved yet".to_string()
    };
    content.push(Line::from(vec![Span::styled("Autosave: ", label), Span::raw(saving)]));

    content.push(Line::from(""));
    content.push(Line::from(Span::styled("Theme", label)));
    for slot in ColorSlot::ALL {
        content.push(Line::from(vec![
            Span::styled("  ■ ", Style::default().fg(theme_color(app, slot))),
            Span::raw(format!("{:<11}{}", slot.name(), editor.theme().get(slot))),
        ]));
    }

    let image = editor.profile_image();
    let photo = if image.is_present() {
        format!(
            "{} ({} bytes)",
            image.mime().unwrap_or("image"),
            image.encoded_len()
        )
    } else {
        "none".to_string()
    };
    content.push(Line::from(""));
    content.push(Line::from(vec![Span::styled("Photo: ", label), Span::raw(photo)]));

    let block = Block::default().title(" Details ").borders(Borders::ALL);
    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let now = Instant::now();

    let (content, style) = if let Some(notification) = app.editor.notification(now) {
        let color = if notification.is_error {
            Color::Red
        } else {
            Color::Green
        };
        (notification.text.clone(), Style::default().fg(color))
    } else if let Some(msg) = &app.status_message {
        (msg.clone(), Style::default().add_modifier(Modifier::DIM))
    } else {
        let hint = match app.editor.focus() {
            Focus::SingleLine => "Enter/Tab:confirm  Esc:cancel  Ctrl+Z:undo",
            Focus::MultiLine => "Enter:new line  Tab:confirm  Esc:cancel",
            Focus::None if app.editor.reorder().is_active() => {
                "j/k:choose target  b:before  a:after  Esc:cancel"
            }
            Focus::None => {
                "Enter:edit  m:move  d:del  u:undo  1-5:level  ::command  ?:help  q:quit"
            }
        };
        (hint.to_string(), Style::default().add_modifier(Modifier::DIM))
    };

    frame.render_widget(Paragraph::new(content).style(style), area);
}

/// Draw command input at the bottom
fn draw_command_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = ":";
    let input = &app.command_input;

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Yellow)),
        Span::raw(input.as_str()),
    ]);

    frame.render_widget(Paragraph::new(line), area);

    // Position cursor
    let cursor_x = area.x + prefix.len() as u16 + app.command_cursor as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw search input at the bottom
fn draw_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = "/";

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Cyan)),
        Span::raw(app.search_text.as_str()),
        Span::styled(
            format!("  ({} matches, Enter:next  Esc:close)", app.search_matches().len()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x + prefix.len() as u16 + app.search_text.chars().count() as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    // Calculate centered popup area
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 26.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let mut help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
    ];
    help_text.extend(
        SHORTCUTS
            .iter()
            .map(|(keys, action)| Line::from(format!("  {:<22}{}", keys, action))),
    );
    help_text.extend([
        Line::from(""),
        Line::from("Terminal:"),
        Line::from("  j/k, ↑/↓              Move selection"),
        Line::from("  Enter, click          Edit field"),
        Line::from("  Tab                   Confirm multi-line edit"),
        Line::from("  m then b/a, drag      Move entry before/after"),
        Line::from("  d / u / Ctrl+R        Delete / undo / redo"),
        Line::from("  1-5                   Language level"),
        Line::from("  :                     Command mode"),
        Line::from("  q                     Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ]);

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvedit_core::{Editor, EditorSettings, MemoryStorage};
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::PathBuf;

    fn app() -> App {
        let editor = Editor::new(Box::new(MemoryStorage::new()), EditorSettings::default());
        App::new(editor, PathBuf::from("cv.txt"))
    }

    #[test]
    fn test_row_at_maps_inside_border() {
        let app = app();
        let tree = Rect::new(0, 0, 40, 20);

        assert_eq!(row_at(&app, tree, 0, 1), None);
        assert_eq!(row_at(&app, tree, 5, 0), None);
        assert_eq!(row_at(&app, tree, 5, 1), Some(0));
        assert_eq!(row_at(&app, tree, 5, 3), Some(2));
        assert_eq!(row_at(&app, tree, 5, 19), None);
    }

    #[test]
    fn test_draw_renders_document() {
        let app = app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|frame| draw(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("Camille Laurent"));
        assert!(screen.contains("History"));
    }
}
