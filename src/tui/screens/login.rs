//! Login screen

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::tui::{
    components::{Form, FormField},
    handlers::CommonKeyHandler,
    traits::{FormHandler, ScreenAction},
    ui::{centered_rect, Styles},
};

pub struct LoginScreen {
    pub form: Form,
    pub api_url: String,
    pub error: Option<String>,
    pub is_submitting: bool,
}

impl LoginScreen {
    pub fn new(api_url: &str) -> Self {
        Self {
            form: Self::empty_form(),
            api_url: api_url.to_string(),
            error: None,
            is_submitting: false,
        }
    }

    fn empty_form() -> Form {
        Self::form_with_username("")
    }

    fn form_with_username(username: &str) -> Form {
        Form::new(vec![
            FormField::new("username").required().with_value(username),
            FormField::new("password").required().masked(),
        ])
    }

    /// Start over, keeping the username and an optional reason
    pub fn reset(&mut self, error: Option<String>) {
        let username = self.form.value("username").unwrap_or_default().to_string();
        self.form = Self::form_with_username(&username);
        if !username.is_empty() {
            self.form.set_current_field(1);
        }
        self.error = error;
        self.is_submitting = false;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Enter => {
                if let Err(message) = self.form.validate() {
                    self.error = Some(message);
                    return ScreenAction::None;
                }
                self.error = None;
                ScreenAction::Login {
                    username: self.form.value("username").unwrap_or_default().trim().to_string(),
                    password: self.form.value("password").unwrap_or_default().to_string(),
                }
            }
            KeyCode::Esc => ScreenAction::Quit,
            KeyCode::Left => {
                self.form.move_cursor_left();
                ScreenAction::None
            }
            KeyCode::Right => {
                self.form.move_cursor_right();
                ScreenAction::None
            }
            _ => CommonKeyHandler::handle_form_keys(&mut self.form, key).unwrap_or(ScreenAction::None),
        }
    }

    pub fn draw(&self, f: &mut Frame, area: Rect) {
        let popup = centered_rect(50, 60, area);
        f.render_widget(Clear, popup);

        let block = Block::default()
            .title("schooldesk - Sign in")
            .borders(Borders::ALL)
            .border_style(Styles::active_border());
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(self.form.height()),
                Constraint::Min(0),
            ])
            .split(inner);

        let server = Paragraph::new(Line::from(vec![
            Span::styled("Server: ", Styles::info()),
            Span::raw(self.api_url.as_str()),
        ]));
        f.render_widget(server, chunks[0]);

        self.form.render(f, chunks[1]);

        let footer = if self.is_submitting {
            Paragraph::new("Signing in...").style(Styles::warning())
        } else if let Some(error) = &self.error {
            Paragraph::new(error.as_str()).style(Styles::error())
        } else {
            Paragraph::new("Tab: next field | Enter: sign in | Esc: quit").style(Styles::inactive())
        };
        f.render_widget(footer.wrap(Wrap { trim: true }), chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(screen: &mut LoginScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_enter_requires_both_fields() {
        let mut screen = LoginScreen::new("http://localhost:8000/api");
        type_text(&mut screen, "admin");
        assert_eq!(screen.handle_key(key(KeyCode::Enter)), ScreenAction::None);
        assert!(screen.error.as_deref().unwrap_or("").contains("Password"));

        screen.handle_key(key(KeyCode::Tab));
        type_text(&mut screen, "s3cret q");
        assert_eq!(
            screen.handle_key(key(KeyCode::Enter)),
            ScreenAction::Login {
                username: "admin".to_string(),
                password: "s3cret q".to_string()
            }
        );
    }

    #[test]
    fn test_reset_keeps_username() {
        let mut screen = LoginScreen::new("http://localhost:8000/api");
        type_text(&mut screen, "teacher1");
        screen.handle_key(key(KeyCode::Tab));
        type_text(&mut screen, "wrong");

        screen.reset(Some("Invalid credentials".to_string()));
        assert_eq!(screen.form.value("username"), Some("teacher1"));
        assert_eq!(screen.form.value("password"), Some(""));
        assert_eq!(screen.form.get_current_field(), 1);
        assert_eq!(screen.error.as_deref(), Some("Invalid credentials"));
    }
}
