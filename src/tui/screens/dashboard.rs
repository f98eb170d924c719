//! Dashboard screen: headline counts, fees and recent notices

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};

use crate::aggregate::{DashboardData, RefreshTimer};
use crate::models::User;
use crate::tui::{
    app::Screen,
    traits::ScreenAction,
    ui::{truncate_string, Styles},
};

pub struct DashboardScreen {
    pub data: Option<DashboardData>,
    pub error: Option<String>,
    pub user: Option<User>,
    pub last_updated: Option<DateTime<Local>>,
    timer: RefreshTimer,
}

impl DashboardScreen {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            data: None,
            error: None,
            user: None,
            last_updated: None,
            timer: RefreshTimer::new(poll_interval),
        }
    }

    pub fn is_refresh_due(&self, now: Instant) -> bool {
        self.timer.is_due(now)
    }

    /// Record the outcome of a refresh; a failure keeps the last data on screen
    pub fn apply(&mut self, result: Result<DashboardData, String>, now: Instant) {
        self.timer.mark(now);
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.last_updated = Some(Local::now());
            }
            Err(message) => self.error = Some(message),
        }
    }

    /// Forget everything from the previous session
    pub fn reset(&mut self) {
        self.data = None;
        self.error = None;
        self.user = None;
        self.last_updated = None;
        self.timer = RefreshTimer::new(self.timer.interval());
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Char('r') => ScreenAction::RefreshDashboard,
            KeyCode::Enter | KeyCode::Char('m') | KeyCode::Tab => ScreenAction::NavigateTo(Screen::Menu),
            KeyCode::Char('l') => ScreenAction::Logout,
            KeyCode::Char('h') => ScreenAction::NavigateTo(Screen::Help),
            _ => ScreenAction::None,
        }
    }

    pub fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(5), // Counts
                Constraint::Length(7), // Fees
                Constraint::Min(0),    // Notices
                Constraint::Length(3), // Footer
            ])
            .split(area);

        self.draw_title(f, chunks[0]);
        self.draw_counts(f, chunks[1]);
        self.draw_fees(f, chunks[2]);
        self.draw_notices(f, chunks[3]);
        self.draw_footer(f, chunks[4]);
    }

    fn draw_title(&self, f: &mut Frame, area: Rect) {
        let title = match &self.user {
            Some(user) => {
                let school = user.school_name.as_deref().unwrap_or("School dashboard");
                format!("{} - {} ({})", school, user.username, user.role.as_str())
            }
            None => "School dashboard".to_string(),
        };
        let widget = Paragraph::new(title)
            .style(Styles::title())
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(widget, area);
    }

    fn draw_counts(&self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ])
            .split(area);

        let counts = match &self.data {
            Some(data) => [data.students, data.teachers, data.classes].map(|n| n.to_string()),
            None => ["-".to_string(), "-".to_string(), "-".to_string()],
        };

        for ((label, value), column) in ["Students", "Teachers", "Classes"]
            .iter()
            .zip(counts.iter())
            .zip(columns.iter())
        {
            let widget = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(value.as_str(), Styles::info().add_modifier(Modifier::BOLD))),
            ])
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(*label)
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border()),
            );
            f.render_widget(widget, *column);
        }
    }

    fn draw_fees(&self, f: &mut Frame, area: Rect) {
        let lines = match &self.data {
            Some(data) => {
                let fees = &data.fees;
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled("Billed: ", Styles::info()),
                        Span::raw(format!("{:.2}", fees.total_billed)),
                        Span::styled("   Paid: ", Styles::info()),
                        Span::raw(format!("{:.2}", fees.total_paid)),
                        Span::styled("   Outstanding: ", Styles::info()),
                        Span::raw(format!("{:.2}", fees.total_outstanding)),
                    ]),
                    Line::from(vec![
                        Span::styled("Collected: ", Styles::info()),
                        Span::raw(format!("{:.1}%", fees.collection_rate())),
                        Span::styled("   Overdue: ", Styles::info()),
                        Span::styled(
                            fees.overdue.to_string(),
                            if fees.overdue > 0 { Styles::error() } else { Styles::default() },
                        ),
                    ]),
                ];
                for balance in fees.by_student.iter().take(3) {
                    lines.push(Line::from(format!(
                        "  {} {:>10.2}",
                        truncate_string(&balance.student, 28),
                        balance.outstanding
                    )));
                }
                lines
            }
            None => vec![Line::from(Span::styled("Loading...", Styles::inactive()))],
        };

        let widget = Paragraph::new(lines).block(
            Block::default()
                .title("Fees")
                .borders(Borders::ALL)
                .border_style(Styles::inactive_border()),
        );
        f.render_widget(widget, area);
    }

    fn draw_notices(&self, f: &mut Frame, area: Rect) {
        let notices = self
            .data
            .as_ref()
            .map(|d| d.recent_notices.as_slice())
            .unwrap_or(&[]);

        let block = Block::default()
            .title("Recent notices")
            .borders(Borders::ALL)
            .border_style(Styles::inactive_border());

        if notices.is_empty() {
            f.render_widget(
                Paragraph::new("No notices").style(Styles::inactive()).block(block),
                area,
            );
            return;
        }

        let items: Vec<ListItem> = notices
            .iter()
            .map(|notice| {
                let posted = notice.text("created_at");
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<10} ", posted.get(..10).unwrap_or(&posted)),
                        Styles::inactive(),
                    ),
                    Span::raw(notice.text("title")),
                ]))
            })
            .collect();
        f.render_widget(List::new(items).block(block), area);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        if let Some(error) = &self.error {
            spans.push(Span::styled(format!("{}  ", error), Styles::error()));
        } else if let Some(data) = self.data.as_ref().filter(|d| !d.degraded.is_empty()) {
            let names: Vec<&str> = data.degraded.iter().map(|r| r.as_str()).collect();
            spans.push(Span::styled(
                format!("Could not load: {}  ", names.join(", ")),
                Styles::warning(),
            ));
        }
        if let Some(updated) = self.last_updated {
            spans.push(Span::styled(
                format!("Updated {}  ", updated.format("%H:%M:%S")),
                Styles::inactive(),
            ));
        }
        spans.push(Span::raw("r: Refresh | Enter: Menu | h: Help | l: Log out"));

        let widget = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::inactive_border()),
        );
        f.render_widget(widget, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_schedule_and_failures() {
        let mut screen = DashboardScreen::new(Duration::from_secs(30));
        let start = Instant::now();
        assert!(screen.is_refresh_due(start));

        let data = DashboardData {
            students: 3,
            ..DashboardData::default()
        };
        screen.apply(Ok(data), start);
        assert!(!screen.is_refresh_due(start + Duration::from_secs(10)));
        assert!(screen.is_refresh_due(start + Duration::from_secs(30)));

        // a failed refresh keeps the last good data
        screen.apply(Err("Network error".to_string()), start + Duration::from_secs(30));
        assert_eq!(screen.data.as_ref().map(|d| d.students), Some(3));
        assert_eq!(screen.error.as_deref(), Some("Network error"));

        screen.reset();
        assert!(screen.data.is_none());
        assert!(screen.is_refresh_due(start + Duration::from_secs(31)));
    }
}
