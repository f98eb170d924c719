//! Status bar at the bottom of every screen

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};

use crate::tui::ui::Styles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub status_type: StatusType,
    pub created: Instant,
}

impl StatusMessage {
    pub fn new(message: String, status_type: StatusType) -> Self {
        Self {
            message,
            status_type,
            created: Instant::now(),
        }
    }
}

/// Current status line; errors stay until replaced, everything else expires
pub struct StatusDisplay {
    pub current_message: Option<StatusMessage>,
    pub auto_clear_timeout: Duration,
}

impl Default for StatusDisplay {
    fn default() -> Self {
        Self {
            current_message: None,
            auto_clear_timeout: Duration::from_secs(5),
        }
    }
}

impl StatusDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_info(&mut self, message: String) {
        self.current_message = Some(StatusMessage::new(message, StatusType::Info));
    }

    pub fn set_success(&mut self, message: String) {
        self.current_message = Some(StatusMessage::new(message, StatusType::Success));
    }

    pub fn set_error(&mut self, message: String) {
        self.current_message = Some(StatusMessage::new(message, StatusType::Error));
    }

    pub fn clear(&mut self) {
        self.current_message = None;
    }

    pub fn get_current(&self) -> Option<&StatusMessage> {
        self.current_message.as_ref()
    }

    pub fn is_error(&self) -> bool {
        matches!(&self.current_message, Some(m) if m.status_type == StatusType::Error)
    }

    /// Drop an expired non-error message
    pub fn tick(&mut self, now: Instant) {
        let expired = match &self.current_message {
            Some(message) => {
                message.status_type != StatusType::Error
                    && now.duration_since(message.created) >= self.auto_clear_timeout
            }
            None => false,
        };
        if expired {
            self.current_message = None;
        }
    }

    /// Render the current message, or `hint` when there is none
    pub fn render(&self, f: &mut Frame, area: Rect, hint: &str) {
        let (content, style) = match &self.current_message {
            Some(message) => {
                let (prefix, style) = match message.status_type {
                    StatusType::Info => ("ℹ", Styles::info()),
                    StatusType::Success => ("✓", Styles::success()),
                    StatusType::Error => ("✗", Styles::error()),
                };
                (format!("{} {}", prefix, message.message), style)
            }
            None => (hint.to_string(), Styles::inactive()),
        };

        let paragraph = Paragraph::new(content).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::inactive_border()),
        );

        f.render_widget(paragraph, area);
    }
}
