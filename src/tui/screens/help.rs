//! Help screen

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::tui::{app::Screen, traits::ScreenAction, ui::Styles};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpSection {
    Overview,
    Navigation,
    Collections,
    Dashboard,
}

impl HelpSection {
    const ALL: [HelpSection; 4] = [
        HelpSection::Overview,
        HelpSection::Navigation,
        HelpSection::Collections,
        HelpSection::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HelpSection::Overview => "Overview",
            HelpSection::Navigation => "Navigation",
            HelpSection::Collections => "Collections",
            HelpSection::Dashboard => "Dashboard",
        }
    }

    fn content(&self) -> Vec<Line<'static>> {
        match self {
            HelpSection::Overview => vec![
                Line::from(Span::styled("schooldesk", Styles::title())),
                Line::from(""),
                Line::from("A terminal client for the school management backend."),
                Line::from("Sign in, then open a collection from the menu to browse,"),
                Line::from("search and edit records. The dashboard refreshes itself."),
                Line::from(""),
                Line::from("Collections offered depend on your role."),
            ],
            HelpSection::Navigation => vec![
                Line::from(Span::styled("Global", Styles::info())),
                Line::from("• Ctrl+C - Quit"),
                Line::from("• q - Quit when no text field is focused"),
                Line::from("• ESC - Go back"),
                Line::from(""),
                Line::from(Span::styled("Lists and menus", Styles::info())),
                Line::from("• ↑/↓ or j/k - Move selection"),
                Line::from("• Home/End - First/last entry"),
                Line::from("• Enter - Open"),
                Line::from(""),
                Line::from(Span::styled("Forms", Styles::info())),
                Line::from("• Tab/Shift+Tab - Next/previous field"),
                Line::from("• ←/→ - Move cursor"),
                Line::from("• Enter - Submit"),
            ],
            HelpSection::Collections => vec![
                Line::from(Span::styled("Browsing", Styles::info())),
                Line::from("• ←/→ or PgUp/PgDn - Previous/next page"),
                Line::from("• / - Search, c - Clear search"),
                Line::from("• r - Reload from the server"),
                Line::from("• x - Export the filtered list to CSV"),
                Line::from(""),
                Line::from(Span::styled("Editing", Styles::info())),
                Line::from("• n - New record"),
                Line::from("• e or Enter - Edit selected record"),
                Line::from("• d or Delete - Delete selected record (asks first)"),
                Line::from("• b - Dismiss the error banner"),
            ],
            HelpSection::Dashboard => vec![
                Line::from("Shows headline counts, the fee summary and the latest notices."),
                Line::from("Sections that fail to load are listed in the footer."),
                Line::from(""),
                Line::from("• r - Refresh now"),
                Line::from("• Enter/m - Menu"),
                Line::from("• h - Help"),
                Line::from("• l - Log out"),
            ],
        }
    }
}

pub struct HelpScreen {
    pub section_state: ListState,
    pub scroll_offset: u16,
}

impl HelpScreen {
    pub fn new() -> Self {
        let mut section_state = ListState::default();
        section_state.select(Some(0));
        Self {
            section_state,
            scroll_offset: 0,
        }
    }

    pub fn current_section(&self) -> HelpSection {
        let index = self.section_state.selected().unwrap_or(0);
        HelpSection::ALL[index.min(HelpSection::ALL.len() - 1)]
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        let index = self.section_state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Up | KeyCode::BackTab if index > 0 => {
                self.section_state.select(Some(index - 1));
                self.scroll_offset = 0;
            }
            KeyCode::Down | KeyCode::Tab if index + 1 < HelpSection::ALL.len() => {
                self.section_state.select(Some(index + 1));
                self.scroll_offset = 0;
            }
            KeyCode::PageDown => self.scroll_offset = self.scroll_offset.saturating_add(5),
            KeyCode::PageUp => self.scroll_offset = self.scroll_offset.saturating_sub(5),
            KeyCode::Esc => return ScreenAction::NavigateBack,
            KeyCode::Enter => return ScreenAction::NavigateTo(Screen::Menu),
            _ => {}
        }
        ScreenAction::None
    }

    pub fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(20), Constraint::Min(0)])
            .split(area);

        let items: Vec<ListItem> = HelpSection::ALL
            .iter()
            .map(|section| ListItem::new(section.as_str()))
            .collect();
        let sections = List::new(items)
            .block(
                Block::default()
                    .title("Help")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            )
            .highlight_style(Styles::selected());
        f.render_stateful_widget(sections, chunks[0], &mut self.section_state);

        let section = self.current_section();
        let content = Paragraph::new(section.content())
            .wrap(Wrap { trim: false })
            .scroll((self.scroll_offset, 0))
            .block(
                Block::default()
                    .title(section.as_str())
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border()),
            );
        f.render_widget(content, chunks[1]);
    }
}

impl Default for HelpScreen {
    fn default() -> Self {
        Self::new()
    }
}
