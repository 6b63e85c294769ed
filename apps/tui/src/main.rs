//! ResearchKit chat: a full-screen chatbot with conversation memory.
//!
//! Replies stream in as they are generated. Built with `ratatui` +
//! `crossterm`.

mod app;
mod ui;
mod widgets;

use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    app::run()
}
