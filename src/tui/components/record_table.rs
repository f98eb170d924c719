//! Table of records drawn as a list with a header row

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::{Record, Resource};
use crate::tui::ui::{truncate_string, Styles};

const NUMBER_WIDTH: usize = 4;
const SEPARATOR: &str = " │ ";
const SEPARATOR_WIDTH: usize = 3;

/// Width of each data column when `total_width` columns are available
pub fn column_width(total_width: usize, columns: usize) -> usize {
    if columns == 0 {
        return 0;
    }
    let separators = SEPARATOR_WIDTH * columns;
    (total_width.saturating_sub(NUMBER_WIDTH + separators) / columns).max(4)
}

pub fn header_line(resource: Resource, width: usize) -> String {
    let mut line = format!("{:<w$}", "No.", w = NUMBER_WIDTH);
    for (_, title) in resource.columns() {
        line.push_str(SEPARATOR);
        line.push_str(&truncate_string(title, width));
    }
    line
}

pub fn row_line(resource: Resource, record: &Record, row_number: usize, width: usize) -> String {
    let mut line = format!("{:>w$}", row_number, w = NUMBER_WIDTH);
    for (field, _) in resource.columns() {
        line.push_str(SEPARATOR);
        line.push_str(&truncate_string(&record.text(field), width));
    }
    line
}

pub struct RecordTable<'a> {
    pub resource: Resource,
    pub rows: &'a [&'a Record],
    /// 1-based number of the first row
    pub first_row_number: usize,
    pub selected: Option<usize>,
    pub title: String,
    pub empty_message: &'a str,
}

impl<'a> RecordTable<'a> {
    pub fn render(&self, f: &mut Frame, area: Rect) {
        if self.rows.is_empty() {
            let empty = Paragraph::new(self.empty_message).style(Styles::inactive()).block(
                Block::default()
                    .title(self.title.as_str())
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border()),
            );
            f.render_widget(empty, area);
            return;
        }

        let width = column_width(
            area.width.saturating_sub(2) as usize,
            self.resource.columns().len(),
        );

        let header = ListItem::new(Line::from(Span::styled(
            header_line(self.resource, width),
            Styles::title(),
        )));

        let items: Vec<ListItem> = std::iter::once(header)
            .chain(self.rows.iter().enumerate().map(|(i, record)| {
                let style = if Some(i) == self.selected {
                    Styles::selected()
                } else {
                    Styles::default()
                };
                let content = row_line(self.resource, record, self.first_row_number + i, width);
                ListItem::new(Line::from(Span::styled(content, style)))
            }))
            .collect();

        let list = List::new(items).block(
            Block::default()
                .title(self.title.as_str())
                .borders(Borders::ALL)
                .border_style(Styles::active_border()),
        );

        // The header occupies the first list slot
        let mut state = ListState::default();
        state.select(self.selected.map(|i| i + 1));
        f.render_stateful_widget(list, area, &mut state);
    }
}
