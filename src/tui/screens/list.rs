//! Collection screen: search box, record table, pagination and the
//! create/edit and delete dialogs

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::models::Resource;
use crate::tui::{
    app::Screen,
    components::{Form, FormField, RecordTable},
    handlers::CommonKeyHandler,
    traits::{FormHandler, Navigable, Paginated, ScreenAction},
    ui::{centered_rect, Styles},
};
use crate::view::{DialogMode, DialogState, ListViewController, LoadState};

pub struct ListScreen {
    pub controller: Option<ListViewController>,
    pub search_input: FormField,
    pub search_focused: bool,
    /// Editing buffer for the open create/edit dialog
    pub form: Option<Form>,
}

impl ListScreen {
    pub fn new() -> Self {
        Self {
            controller: None,
            search_input: Self::search_field(),
            search_focused: false,
            form: None,
        }
    }

    fn search_field() -> FormField {
        FormField::new("search").with_placeholder("Press / to search")
    }

    /// Show a collection; the caller fetches it
    pub fn open(&mut self, controller: ListViewController) {
        self.controller = Some(controller);
        self.search_input = Self::search_field();
        self.search_focused = false;
        self.form = None;
    }

    pub fn close(&mut self) {
        self.controller = None;
        self.form = None;
        self.search_focused = false;
    }

    pub fn resource(&self) -> Option<Resource> {
        self.controller.as_ref().map(|c| c.resource())
    }

    /// Whether keystrokes are going into a text field
    pub fn captures_text(&self) -> bool {
        self.search_focused || self.form.is_some()
    }

    /// Drop the dialog buffer once the controller closed the dialog
    pub fn sync_dialog(&mut self) {
        let closed = self
            .controller
            .as_ref()
            .map_or(true, |c| *c.dialog() == DialogState::Closed);
        if closed {
            self.form = None;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        let Some(controller) = self.controller.as_mut() else {
            return match key.code {
                KeyCode::Esc => ScreenAction::NavigateTo(Screen::Menu),
                _ => ScreenAction::None,
            };
        };

        if controller.pending_delete().is_some() {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Enter => ScreenAction::ConfirmDelete,
                KeyCode::Char('n') | KeyCode::Esc => {
                    controller.cancel_delete();
                    ScreenAction::SetStatus("Delete cancelled".to_string())
                }
                _ => ScreenAction::None,
            };
        }

        if self.form.is_some() {
            return self.handle_dialog_key(key);
        }

        if self.search_focused {
            return self.handle_search_key(key);
        }

        self.handle_table_key(key)
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) -> ScreenAction {
        let (Some(controller), Some(form)) = (self.controller.as_mut(), self.form.as_mut()) else {
            return ScreenAction::None;
        };
        if matches!(controller.dialog(), DialogState::Submitting { .. }) {
            return ScreenAction::None;
        }

        match key.code {
            KeyCode::Esc => {
                controller.close_dialog();
                self.form = None;
                ScreenAction::None
            }
            KeyCode::Enter => {
                if let Err(message) = form.validate() {
                    return ScreenAction::SetError(message);
                }
                if let Some(data) = controller.dialog_form_mut() {
                    form.write_to(data);
                }
                ScreenAction::SubmitForm
            }
            KeyCode::Left => {
                form.move_cursor_left();
                ScreenAction::None
            }
            KeyCode::Right => {
                form.move_cursor_right();
                ScreenAction::None
            }
            _ => CommonKeyHandler::handle_form_keys(form, key).unwrap_or(ScreenAction::None),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Tab => {
                self.search_focused = false;
                self.search_input.set_focus(false);
                return ScreenAction::None;
            }
            KeyCode::Char(c) => self.search_input.insert_char(c),
            KeyCode::Backspace => self.search_input.delete_char(),
            KeyCode::Delete => self.search_input.delete_char_forward(),
            KeyCode::Left => self.search_input.move_cursor_left(),
            KeyCode::Right => self.search_input.move_cursor_right(),
            _ => return ScreenAction::None,
        }
        if let Some(controller) = self.controller.as_mut() {
            if controller.search() != self.search_input.value {
                controller.set_search(&self.search_input.value);
            }
        }
        ScreenAction::None
    }

    fn handle_table_key(&mut self, key: KeyEvent) -> ScreenAction {
        if let Some(action) = CommonKeyHandler::handle_navigation_keys(self, key) {
            return action;
        }
        if let Some(action) = CommonKeyHandler::handle_pagination_keys(self, key) {
            return action;
        }

        let Some(controller) = self.controller.as_mut() else {
            return ScreenAction::None;
        };
        let resource = controller.resource();

        match key.code {
            KeyCode::Char('/') => {
                self.search_focused = true;
                self.search_input.set_focus(true);
                ScreenAction::None
            }
            KeyCode::Char('c') => {
                self.search_input.clear();
                controller.set_search("");
                ScreenAction::SetStatus("Search cleared".to_string())
            }
            KeyCode::Char('n') => {
                controller.open_create();
                self.form = Some(Form::for_resource(resource, &Default::default()));
                ScreenAction::None
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                let Some(id) = controller.selected_record().map(|r| r.id) else {
                    return ScreenAction::SetError("No record selected".to_string());
                };
                if controller.open_edit(id) {
                    if let DialogState::Open { form, .. } = controller.dialog() {
                        self.form = Some(Form::for_resource(resource, form));
                    }
                }
                ScreenAction::None
            }
            KeyCode::Char('d') | KeyCode::Delete => match controller.selected_record().map(|r| r.id) {
                Some(id) => {
                    controller.request_delete(id);
                    ScreenAction::None
                }
                None => ScreenAction::SetError("No record selected".to_string()),
            },
            KeyCode::Char('r') => ScreenAction::RefreshList,
            KeyCode::Char('x') => ScreenAction::ExportList,
            KeyCode::Char('b') => {
                controller.dismiss_banner();
                ScreenAction::None
            }
            KeyCode::Esc => ScreenAction::NavigateTo(Screen::Menu),
            _ => ScreenAction::None,
        }
    }

    pub fn draw(&self, f: &mut Frame, area: Rect) {
        let Some(controller) = self.controller.as_ref() else {
            let empty = Paragraph::new("Choose a collection from the menu")
                .style(Styles::inactive())
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(empty, area);
            return;
        };

        let banner_height = if controller.banner().is_some() { 3 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),             // Title
                Constraint::Length(banner_height), // Error banner
                Constraint::Length(3),             // Search
                Constraint::Min(0),                // Table
                Constraint::Length(3),             // Pagination
            ])
            .split(area);

        self.draw_title(f, chunks[0], controller);
        if let Some(banner) = controller.banner() {
            let widget = Paragraph::new(banner)
                .style(Styles::error())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .title("Error (b to dismiss)")
                        .borders(Borders::ALL)
                        .border_style(Styles::error()),
                );
            f.render_widget(widget, chunks[1]);
        }
        self.search_input.render(f, chunks[2]);

        let rows = controller.page_rows();
        let empty_message = match controller.load_state() {
            LoadState::Loading | LoadState::Idle => "Loading...",
            _ if controller.search().is_empty() => "No records yet. Press n to create one.",
            _ => "No records match the search.",
        };
        RecordTable {
            resource: controller.resource(),
            rows: &rows,
            first_row_number: controller.first_row_number(),
            selected: controller.selected_index(),
            title: controller.resource().title().to_string(),
            empty_message,
        }
        .render(f, chunks[3]);

        self.draw_pagination(f, chunks[4], controller);

        if let Some(form) = &self.form {
            self.draw_dialog(f, area, controller, form);
        } else if let Some(id) = controller.pending_delete() {
            self.draw_delete_confirmation(f, area, controller.resource(), id);
        }
    }

    fn draw_title(&self, f: &mut Frame, area: Rect, controller: &ListViewController) {
        let state = match controller.load_state() {
            LoadState::Loading => " - loading...".to_string(),
            _ => format!(" - {} records", controller.filtered().len()),
        };
        let title = Paragraph::new(format!("{}{}", controller.resource().title(), state))
            .style(Styles::title())
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, area);
    }

    fn draw_pagination(&self, f: &mut Frame, area: Rect, controller: &ListViewController) {
        let prev_style = if controller.has_prev() { Styles::info() } else { Styles::disabled() };
        let next_style = if controller.has_next() { Styles::info() } else { Styles::disabled() };

        let line = Line::from(vec![
            Span::styled("◀ Prev", prev_style),
            Span::raw(format!(
                "   Page {} of {}   ",
                controller.page(),
                controller.total_pages()
            )),
            Span::styled("Next ▶", next_style),
            Span::styled(
                "   n: New | e: Edit | d: Delete | /: Search | r: Refresh | x: Export | Esc: Menu",
                Styles::inactive(),
            ),
        ]);
        let widget = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::inactive_border()),
        );
        f.render_widget(widget, area);
    }

    fn draw_dialog(&self, f: &mut Frame, area: Rect, controller: &ListViewController, form: &Form) {
        let (mode, submitting) = match controller.dialog() {
            DialogState::Open { mode, .. } => (*mode, false),
            DialogState::Submitting { mode, .. } => (*mode, true),
            DialogState::Closed => return,
        };
        let title = match mode {
            DialogMode::Create => format!("New {}", controller.resource().singular()),
            DialogMode::Edit(id) => format!("Edit {} #{}", controller.resource().singular(), id),
        };

        let popup = centered_rect(60, 80, area);
        f.render_widget(Clear, popup);
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Styles::active_border());
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(2)])
            .split(inner);
        form.render(f, chunks[0]);

        let footer = if submitting {
            Paragraph::new("Saving...").style(Styles::warning())
        } else if let Some(banner) = controller.banner() {
            Paragraph::new(banner).style(Styles::error())
        } else {
            Paragraph::new("Tab: next field | Enter: save | Esc: cancel").style(Styles::inactive())
        };
        f.render_widget(footer.wrap(Wrap { trim: true }), chunks[1]);
    }

    fn draw_delete_confirmation(&self, f: &mut Frame, area: Rect, resource: Resource, id: i64) {
        let popup = centered_rect(40, 20, area);
        f.render_widget(Clear, popup);
        let widget = Paragraph::new(vec![
            Line::from(format!("Delete {} #{}?", resource.singular(), id)),
            Line::from(""),
            Line::from(Span::styled("y: Delete | n: Cancel", Styles::inactive())),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("Confirm delete")
                .borders(Borders::ALL)
                .border_style(Styles::warning()),
        );
        f.render_widget(widget, popup);
    }
}

impl Default for ListScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigable for ListScreen {
    fn navigate_up(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            controller.select_prev();
        }
    }

    fn navigate_down(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            controller.select_next();
        }
    }

    fn get_selected_index(&self) -> Option<usize> {
        self.controller.as_ref().and_then(|c| c.selected_index())
    }

    fn set_selected_index(&mut self, index: Option<usize>) {
        if let Some(controller) = self.controller.as_mut() {
            controller.select(index);
        }
    }

    fn get_item_count(&self) -> usize {
        self.controller.as_ref().map_or(0, |c| c.page_rows().len())
    }
}

impl Paginated for ListScreen {
    fn get_current_page(&self) -> usize {
        self.controller.as_ref().map_or(1, |c| c.page())
    }

    fn set_current_page(&mut self, page: usize) {
        if let Some(controller) = self.controller.as_mut() {
            controller.go_to_page(page);
        }
    }

    fn get_total_pages(&self) -> usize {
        self.controller.as_ref().map_or(1, |c| c.total_pages())
    }
}
