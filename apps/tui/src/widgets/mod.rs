//! Reusable TUI widgets.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Bottom status bar.
pub(crate) fn status_bar(msg: &str) -> Paragraph<'_> {
    Paragraph::new(format!(" {msg}"))
        .style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White),
        )
}

/// Single-line message input.
pub(crate) fn input_box(text: &str) -> Paragraph<'_> {
    Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" What is on your mind? "),
    )
}
