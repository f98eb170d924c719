//! Core traits for the terminal UI screens

use crate::models::Resource;
use crate::tui::app::Screen;

/// Actions that can be returned from screen event handling
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenAction {
    /// Navigate to a different screen
    NavigateTo(Screen),
    /// Go back to previous screen
    NavigateBack,
    /// Quit the application
    Quit,
    SetStatus(String),
    SetError(String),
    ClearMessages,

    // Work that needs the API; the app performs it
    Login { username: String, password: String },
    Logout,
    RefreshDashboard,
    OpenResource(Resource),
    RefreshList,
    SubmitForm,
    ConfirmDelete,
    ExportList,

    /// No action taken
    None,
}

/// Trait for screens with navigable lists
pub trait Navigable {
    fn navigate_up(&mut self);

    fn navigate_down(&mut self);

    fn get_selected_index(&self) -> Option<usize>;

    fn set_selected_index(&mut self, index: Option<usize>);

    fn get_item_count(&self) -> usize;

    fn navigate_to_first(&mut self) {
        if self.get_item_count() > 0 {
            self.set_selected_index(Some(0));
        }
    }

    fn navigate_to_last(&mut self) {
        let count = self.get_item_count();
        if count > 0 {
            self.set_selected_index(Some(count - 1));
        }
    }
}

/// Trait for screens with paginated content. Pages are 1-based.
pub trait Paginated {
    fn get_current_page(&self) -> usize;

    /// Set current page; implementations clamp to the valid range
    fn set_current_page(&mut self, page: usize);

    fn get_total_pages(&self) -> usize;

    fn next_page(&mut self) {
        let current = self.get_current_page();
        if current < self.get_total_pages() {
            self.set_current_page(current + 1);
        }
    }

    fn previous_page(&mut self) {
        let current = self.get_current_page();
        if current > 1 {
            self.set_current_page(current - 1);
        }
    }

    fn go_to_first_page(&mut self) {
        self.set_current_page(1);
    }

    fn go_to_last_page(&mut self) {
        let total = self.get_total_pages();
        self.set_current_page(total.max(1));
    }
}

/// Trait for form handling
pub trait FormHandler {
    fn get_current_field(&self) -> usize;

    fn set_current_field(&mut self, field: usize);

    fn get_field_count(&self) -> usize;

    fn next_field(&mut self) {
        let total = self.get_field_count();
        if total == 0 {
            return;
        }
        let current = self.get_current_field();
        self.set_current_field((current + 1) % total);
    }

    fn previous_field(&mut self) {
        let total = self.get_field_count();
        if total == 0 {
            return;
        }
        let current = self.get_current_field();
        self.set_current_field(if current == 0 { total - 1 } else { current - 1 });
    }

    fn handle_char_input(&mut self, c: char);

    fn handle_backspace(&mut self);

    fn handle_delete(&mut self);

    /// Check required fields before submitting
    fn validate(&mut self) -> Result<(), String>;
}
