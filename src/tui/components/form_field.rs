//! Form field component for user input

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::models::{FormData, Resource};
use crate::tui::{traits::FormHandler, ui::Styles};

/// Individual form field
#[derive(Debug, Clone)]
pub struct FormField {
    /// Field name sent to the API
    pub name: String,
    pub label: String,
    pub value: String,
    pub placeholder: String,
    pub required: bool,
    /// Render the value as asterisks
    pub masked: bool,
    pub is_focused: bool,
    /// Cursor position in characters
    pub cursor_position: usize,
    pub validation_error: Option<String>,
}

impl FormField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: field_label(name),
            value: String::new(),
            placeholder: String::new(),
            required: false,
            masked: false,
            is_focused: false,
            cursor_position: 0,
            validation_error: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self.cursor_position = value.chars().count();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn set_focus(&mut self, focused: bool) {
        self.is_focused = focused;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let index = self.byte_index(self.cursor_position);
        self.value.insert(index, c);
        self.cursor_position += 1;
        self.validation_error = None;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let index = self.byte_index(self.cursor_position);
            self.value.remove(index);
            self.validation_error = None;
        }
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.value.chars().count() {
            let index = self.byte_index(self.cursor_position);
            self.value.remove(index);
            self.validation_error = None;
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.value.chars().count() {
            self.cursor_position += 1;
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor_position = 0;
        self.validation_error = None;
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn validate(&mut self) -> bool {
        self.validation_error = None;
        if self.required && self.is_empty() {
            self.validation_error = Some("required".to_string());
            return false;
        }
        true
    }

    fn display_value(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    /// Render the form field
    pub fn render(&self, f: &mut Frame, area: Rect) {
        let showing_placeholder = self.value.is_empty() && !self.placeholder.is_empty();
        let display_text = if showing_placeholder {
            self.placeholder.clone()
        } else {
            self.display_value()
        };

        let border_style = if self.is_focused {
            Styles::active_border()
        } else if self.validation_error.is_some() {
            Styles::error()
        } else {
            Styles::inactive_border()
        };

        let marker = if self.required { " *" } else { "" };
        let title = match &self.validation_error {
            Some(error) => format!("{}{} - {}", self.label, marker, error),
            None => format!("{}{}", self.label, marker),
        };

        let text_style = if showing_placeholder {
            Styles::inactive()
        } else {
            Styles::default()
        };

        let paragraph = Paragraph::new(display_text).style(text_style).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        );

        f.render_widget(paragraph, area);

        if self.is_focused {
            let before_cursor: String = self.display_value().chars().take(self.cursor_position).collect();
            let cursor_x = area.x + 1 + before_cursor.width() as u16;
            let cursor_y = area.y + 1;
            if cursor_x < area.x + area.width.saturating_sub(1) {
                f.set_cursor(cursor_x, cursor_y);
            }
        }
    }
}

/// "admission_number" -> "Admission number"
pub fn field_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Form container that manages multiple fields
#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<FormField>,
    pub current_field: usize,
}

impl Form {
    pub fn new(fields: Vec<FormField>) -> Self {
        let mut form = Self {
            fields,
            current_field: 0,
        };
        form.update_focus();
        form
    }

    /// Fields for a resource's create/edit dialog, pre-filled from `data`
    pub fn for_resource(resource: Resource, data: &FormData) -> Self {
        let required = resource.required_fields();
        let fields = resource
            .form_fields()
            .into_iter()
            .map(|name| {
                let field = FormField::new(name).with_value(data.get(name).unwrap_or(""));
                if required.contains(&name) {
                    field.required()
                } else {
                    field
                }
            })
            .collect();
        Self::new(fields)
    }

    fn update_focus(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.set_focus(i == self.current_field);
        }
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn get_current_field_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.current_field)
    }

    /// Copy the entered values into the form data sent to the API.
    /// Empty fields the data never held are left out.
    pub fn write_to(&self, data: &mut FormData) {
        for field in &self.fields {
            if field.value.trim().is_empty() && data.get(&field.name).is_none() {
                continue;
            }
            data.set(&field.name, &field.value);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if let Some(field) = self.get_current_field_mut() {
            field.move_cursor_left();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if let Some(field) = self.get_current_field_mut() {
            field.move_cursor_right();
        }
    }

    /// Height needed to draw every field
    pub fn height(&self) -> u16 {
        (self.fields.len() as u16).saturating_mul(3)
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        if self.fields.is_empty() {
            return;
        }
        // Keep the focused field visible when the area is too short
        let visible = (area.height / 3).max(1) as usize;
        let first = self.current_field.saturating_sub(visible.saturating_sub(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(3); visible])
            .split(area);

        for (chunk, field) in chunks.iter().zip(self.fields.iter().skip(first)) {
            field.render(f, *chunk);
        }
    }
}

impl FormHandler for Form {
    fn get_current_field(&self) -> usize {
        self.current_field
    }

    fn set_current_field(&mut self, field: usize) {
        if field < self.fields.len() {
            self.current_field = field;
            self.update_focus();
        }
    }

    fn get_field_count(&self) -> usize {
        self.fields.len()
    }

    fn handle_char_input(&mut self, c: char) {
        if let Some(field) = self.get_current_field_mut() {
            field.insert_char(c);
        }
    }

    fn handle_backspace(&mut self) {
        if let Some(field) = self.get_current_field_mut() {
            field.delete_char();
        }
    }

    fn handle_delete(&mut self) {
        if let Some(field) = self.get_current_field_mut() {
            field.delete_char_forward();
        }
    }

    fn validate(&mut self) -> Result<(), String> {
        let missing: Vec<String> = self
            .fields
            .iter_mut()
            .filter_map(|field| (!field.validate()).then(|| field.label.clone()))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Please fill in the required fields: {}", missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editing_multibyte_values() {
        let mut field = FormField::new("name").with_value("Zoë");
        field.delete_char();
        field.insert_char('e');
        assert_eq!(field.value, "Zoe");

        field.move_cursor_left();
        field.move_cursor_left();
        field.insert_char('ö');
        assert_eq!(field.value, "Zöoe");
        field.delete_char_forward();
        assert_eq!(field.value, "Zöe");
    }

    #[test]
    fn test_field_label() {
        assert_eq!(field_label("admission_number"), "Admission number");
        assert_eq!(field_label(""), "");
    }

    #[test]
    fn test_form_for_resource_and_write_back() {
        let data = FormData::new().with("name", "Algebra");
        let mut form = Form::for_resource(Resource::Subjects, &data);
        assert_eq!(form.value("name"), Some("Algebra"));
        assert!(form.fields[0].required);
        assert!(form.fields[0].is_focused);

        assert_eq!(
            form.validate(),
            Err("Please fill in the required fields: Code".to_string())
        );

        form.next_field();
        for c in "ALG".chars() {
            form.handle_char_input(c);
        }
        assert!(form.validate().is_ok());

        let mut out = FormData::new();
        form.write_to(&mut out);
        assert_eq!(out.get("code"), Some("ALG"));
        assert!(out.missing_required(Resource::Subjects).is_empty());
        assert_eq!(out.get("teacher"), None);
    }

    #[test]
    fn test_field_focus_wraps() {
        let mut form = Form::new(vec![FormField::new("a"), FormField::new("b")]);
        form.previous_field();
        assert_eq!(form.get_current_field(), 1);
        assert!(form.fields[1].is_focused && !form.fields[0].is_focused);
        form.next_field();
        assert_eq!(form.get_current_field(), 0);
    }
}
