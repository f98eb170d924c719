//! Terminal user interface
//!
//! Login, dashboard, role-based menu and one generic screen for every
//! collection, driven by the same list controller the CLI uses.

pub mod app;
pub mod components;
pub mod handlers;
pub mod screens;
pub mod traits;
pub mod ui;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing::{error, info};

use crate::config::Config;

pub use app::App;

/// Take over the terminal and run the app until the user quits
pub async fn run(config: Config) -> Result<()> {
    let mut app = App::new(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    match &result {
        Ok(()) => info!("TUI exited"),
        Err(e) => error!("TUI encountered an error: {:#}", e),
    }
    result
}
