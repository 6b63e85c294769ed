//! Rendering for the chat screen.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use researchkit_shared::Role;

use crate::app::App;
use crate::widgets::{input_box, status_bar};

/// Cursor appended to a reply while it is still streaming.
const STREAM_CURSOR: &str = "▌";

pub(crate) fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_transcript(f, app, chunks[0]);
    f.render_widget(input_box(&app.input), chunks[1]);
    f.render_widget(status_bar(&app.status), chunks[2]);

    // Cursor at the end of the input text, inside the border.
    let cursor_x = chunks[1].x + 1 + app.input.chars().count() as u16;
    f.set_cursor_position((cursor_x.min(chunks[1].right().saturating_sub(2)), chunks[1].y + 1));
}

fn draw_transcript(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" AI Assistant ");
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    let entries = transcript(app);
    let lines: Vec<Line> = entries
        .iter()
        .flat_map(|(role, text)| entry_lines(*role, text))
        .collect();

    let total = wrapped_height(&entries, inner_width);
    let bottom = total.saturating_sub(inner_height);
    let offset = bottom.saturating_sub(app.scroll_back);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));

    f.render_widget(paragraph, area);
}

/// Visible messages plus the in-flight reply, as `(role, text)` pairs.
pub(crate) fn transcript(app: &App) -> Vec<(Role, String)> {
    let mut entries: Vec<(Role, String)> = app
        .conversation
        .visible()
        .map(|m| (m.role, m.content.clone()))
        .collect();

    if let Some(pending) = &app.pending {
        entries.push((Role::Assistant, format!("{pending}{STREAM_CURSOR}")));
    }
    entries
}

fn entry_lines(role: Role, text: &str) -> Vec<Line<'static>> {
    let (label, style) = match role {
        Role::User => ("You: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        _ => ("AI: ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
    };

    let mut lines: Vec<Line> = text
        .split('\n')
        .enumerate()
        .map(|(i, part)| {
            if i == 0 {
                Line::from(vec![Span::styled(label, style), Span::raw(part.to_string())])
            } else {
                Line::from(part.to_string())
            }
        })
        .collect();
    lines.push(Line::from(""));
    lines
}

/// Approximate rendered height of the transcript at `width` columns.
pub(crate) fn wrapped_height(entries: &[(Role, String)], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = entries
        .iter()
        .map(|(role, text)| {
            let label = if *role == Role::User { 5 } else { 4 };
            let body: usize = text
                .split('\n')
                .enumerate()
                .map(|(i, part)| {
                    let cols = part.chars().count() + if i == 0 { label } else { 0 };
                    cols.div_ceil(width).max(1)
                })
                .sum();
            body + 1
        })
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_hides_system_and_shows_cursor() {
        let mut app = App::new("secret system prompt");
        app.start_turn("hi");
        app.push_delta("Hel");

        let entries = transcript(&app);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (Role::User, "hi".to_string()));
        assert_eq!(entries[1], (Role::Assistant, "Hel▌".to_string()));
    }

    #[test]
    fn wrapped_height_counts_wraps_and_spacers() {
        let entries = vec![
            (Role::User, "hi".to_string()),              // "You: hi" -> 1 row + spacer
            (Role::Assistant, "x".repeat(16)),           // "AI: " + 16 = 20 cols -> 2 rows + spacer
            (Role::Assistant, "a\nb".to_string()),       // 2 rows + spacer
        ];
        assert_eq!(wrapped_height(&entries, 10), 2 + 3 + 3);
    }

    #[test]
    fn wrapped_height_zero_width_is_safe() {
        let entries = vec![(Role::User, "hello".to_string())];
        assert!(wrapped_height(&entries, 0) > 0);
    }
}
