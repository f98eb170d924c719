//! Common event handlers shared by the screens

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::traits::{FormHandler, Navigable, Paginated, ScreenAction};

/// Common keyboard event handling utilities
pub struct CommonKeyHandler;

impl CommonKeyHandler {
    /// Handle navigation keys for list-based screens
    pub fn handle_navigation_keys<T: Navigable>(
        navigable: &mut T,
        key: KeyEvent,
    ) -> Option<ScreenAction> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                navigable.navigate_up();
                Some(ScreenAction::None)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                navigable.navigate_down();
                Some(ScreenAction::None)
            }
            KeyCode::Home => {
                navigable.navigate_to_first();
                Some(ScreenAction::None)
            }
            KeyCode::End => {
                navigable.navigate_to_last();
                Some(ScreenAction::None)
            }
            _ => None,
        }
    }

    /// Handle pagination keys
    pub fn handle_pagination_keys<T: Paginated>(
        paginated: &mut T,
        key: KeyEvent,
    ) -> Option<ScreenAction> {
        let before = paginated.get_current_page();
        match key.code {
            KeyCode::Left | KeyCode::PageUp => paginated.previous_page(),
            KeyCode::Right | KeyCode::PageDown => paginated.next_page(),
            KeyCode::Char('<') => paginated.go_to_first_page(),
            KeyCode::Char('>') => paginated.go_to_last_page(),
            _ => return None,
        }

        if paginated.get_current_page() == before {
            return Some(ScreenAction::None);
        }
        Some(ScreenAction::SetStatus(format!(
            "Page {} of {}",
            paginated.get_current_page(),
            paginated.get_total_pages()
        )))
    }

    /// Handle form navigation and input
    pub fn handle_form_keys<T: FormHandler>(form: &mut T, key: KeyEvent) -> Option<ScreenAction> {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                form.next_field();
                Some(ScreenAction::None)
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.previous_field();
                Some(ScreenAction::None)
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                form.handle_char_input(c);
                Some(ScreenAction::None)
            }
            KeyCode::Backspace => {
                form.handle_backspace();
                Some(ScreenAction::None)
            }
            KeyCode::Delete => {
                form.handle_delete();
                Some(ScreenAction::None)
            }
            _ => None,
        }
    }

    /// Handle global application keys. Screens that are capturing text skip
    /// the single-letter shortcuts.
    pub fn handle_global_keys(key: KeyEvent, capturing_text: bool) -> Option<ScreenAction> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(ScreenAction::Quit)
            }
            KeyCode::Char('q') if !capturing_text => Some(ScreenAction::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages {
        page: usize,
        total: usize,
    }

    impl Paginated for Pages {
        fn get_current_page(&self) -> usize {
            self.page
        }

        fn set_current_page(&mut self, page: usize) {
            self.page = page.clamp(1, self.total.max(1));
        }

        fn get_total_pages(&self) -> usize {
            self.total
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_pagination_keys_stop_at_the_ends() {
        let mut pages = Pages { page: 1, total: 3 };

        assert_eq!(
            CommonKeyHandler::handle_pagination_keys(&mut pages, key(KeyCode::Left)),
            Some(ScreenAction::None)
        );
        assert_eq!(pages.page, 1);

        assert_eq!(
            CommonKeyHandler::handle_pagination_keys(&mut pages, key(KeyCode::Char('>'))),
            Some(ScreenAction::SetStatus("Page 3 of 3".to_string()))
        );
        CommonKeyHandler::handle_pagination_keys(&mut pages, key(KeyCode::Right));
        assert_eq!(pages.page, 3);

        assert_eq!(CommonKeyHandler::handle_pagination_keys(&mut pages, key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_quit_is_suppressed_while_typing() {
        assert_eq!(
            CommonKeyHandler::handle_global_keys(key(KeyCode::Char('q')), false),
            Some(ScreenAction::Quit)
        );
        assert_eq!(CommonKeyHandler::handle_global_keys(key(KeyCode::Char('q')), true), None);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(CommonKeyHandler::handle_global_keys(ctrl_c, true), Some(ScreenAction::Quit));
    }
}
