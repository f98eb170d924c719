//! Navigation menu listing the collections the user may open

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::{Resource, Role};
use crate::tui::{
    app::Screen,
    handlers::CommonKeyHandler,
    traits::{Navigable, ScreenAction},
    ui::Styles,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Dashboard,
    Collection(Resource),
    Help,
    Logout,
}

impl MenuItem {
    pub fn title(&self) -> &'static str {
        match self {
            MenuItem::Dashboard => "Dashboard",
            MenuItem::Collection(resource) => resource.title(),
            MenuItem::Help => "Help",
            MenuItem::Logout => "Log out",
        }
    }

    fn action(&self) -> ScreenAction {
        match self {
            MenuItem::Dashboard => ScreenAction::NavigateTo(Screen::Dashboard),
            MenuItem::Collection(resource) => ScreenAction::OpenResource(*resource),
            MenuItem::Help => ScreenAction::NavigateTo(Screen::Help),
            MenuItem::Logout => ScreenAction::Logout,
        }
    }
}

pub struct MenuScreen {
    pub items: Vec<MenuItem>,
    pub menu_state: ListState,
}

impl MenuScreen {
    pub fn new() -> Self {
        let mut screen = Self {
            items: Vec::new(),
            menu_state: ListState::default(),
        };
        screen.set_role(&Role::Other);
        screen
    }

    /// Rebuild the entries for the logged in user's role
    pub fn set_role(&mut self, role: &Role) {
        self.items = std::iter::once(MenuItem::Dashboard)
            .chain(role.resources().into_iter().map(MenuItem::Collection))
            .chain([MenuItem::Help, MenuItem::Logout])
            .collect();
        self.menu_state.select(Some(0));
    }

    pub fn selected_item(&self) -> Option<MenuItem> {
        self.menu_state.selected().and_then(|i| self.items.get(i).copied())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        if let Some(action) = CommonKeyHandler::handle_navigation_keys(self, key) {
            return action;
        }
        match key.code {
            KeyCode::Enter => self
                .selected_item()
                .map(|item| item.action())
                .unwrap_or(ScreenAction::None),
            KeyCode::Esc => ScreenAction::NavigateTo(Screen::Dashboard),
            _ => ScreenAction::None,
        }
    }

    pub fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(area);

        let title = Paragraph::new("Menu")
            .style(Styles::title().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let items: Vec<ListItem> = self
            .items
            .iter()
            .map(|item| {
                let style = match item {
                    MenuItem::Collection(_) => Styles::default(),
                    _ => Styles::info(),
                };
                ListItem::new(Line::from(Span::styled(format!("  {}", item.title()), style)))
            })
            .collect();

        let menu = List::new(items)
            .block(
                Block::default()
                    .title("Open")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            )
            .highlight_style(Styles::selected());
        f.render_stateful_widget(menu, chunks[1], &mut self.menu_state);

        let instructions = Paragraph::new("↑/↓: Move | Enter: Open | Esc: Dashboard | q: Quit")
            .style(Styles::inactive())
            .block(Block::default().borders(Borders::ALL).border_style(Styles::inactive_border()));
        f.render_widget(instructions, chunks[2]);
    }
}

impl Default for MenuScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigable for MenuScreen {
    fn navigate_up(&mut self) {
        let count = self.items.len();
        if count == 0 {
            return;
        }
        let selected = self.menu_state.selected().unwrap_or(0);
        self.menu_state.select(Some(if selected == 0 { count - 1 } else { selected - 1 }));
    }

    fn navigate_down(&mut self) {
        let count = self.items.len();
        if count == 0 {
            return;
        }
        let selected = self.menu_state.selected().unwrap_or(0);
        self.menu_state.select(Some((selected + 1) % count));
    }

    fn get_selected_index(&self) -> Option<usize> {
        self.menu_state.selected()
    }

    fn set_selected_index(&mut self, index: Option<usize>) {
        self.menu_state.select(index);
    }

    fn get_item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_items_follow_role() {
        let mut menu = MenuScreen::new();
        menu.set_role(&Role::Student);
        assert_eq!(menu.items.first(), Some(&MenuItem::Dashboard));
        assert!(menu.items.contains(&MenuItem::Collection(Resource::Fees)));
        assert!(!menu.items.contains(&MenuItem::Collection(Resource::Teachers)));
        assert_eq!(menu.items.last(), Some(&MenuItem::Logout));
    }

    #[test]
    fn test_enter_opens_selected_collection() {
        let mut menu = MenuScreen::new();
        menu.set_role(&Role::Teacher);

        menu.handle_key(key(KeyCode::Down));
        assert_eq!(
            menu.handle_key(key(KeyCode::Enter)),
            ScreenAction::OpenResource(Resource::Classes)
        );

        // wraps from the top to the last entry
        menu.handle_key(key(KeyCode::Home));
        menu.handle_key(key(KeyCode::Up));
        assert_eq!(menu.handle_key(key(KeyCode::Enter)), ScreenAction::Logout);
    }
}
