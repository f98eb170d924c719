//! API error types and their user-facing messages

use serde_json::Value;
use thiserror::Error;

pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired or invalid (HTTP 401)")]
    Unauthorized,

    #[error("Permission denied (HTTP 403)")]
    Forbidden { detail: Option<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected (status {status}): {body}")]
    Validation { status: u16, body: Value },

    #[error("Server error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Human-readable text for the inline error banner
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => SESSION_EXPIRED.to_string(),
            ApiError::Forbidden { detail } => match detail {
                Some(detail) if !detail.starts_with("You do not have permission") => {
                    format!("{}: {}", PERMISSION_DENIED.trim_end_matches('.'), detail)
                }
                _ => PERMISSION_DENIED.to_string(),
            },
            ApiError::NotFound(what) => format!("{} was not found.", what),
            ApiError::Validation { body, .. } => extract_error_message(body),
            ApiError::Server { status, .. } => {
                format!("Server error ({}). Please try again later.", status)
            }
            ApiError::Decode { .. } => "Unexpected response from the server.".to_string(),
            ApiError::MissingFields(fields) => {
                format!("Please fill in the required fields: {}", fields.join(", "))
            }
            ApiError::Transport(e) => format!("Network error: {}", e),
            ApiError::Io(e) => format!("File error: {}", e),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Pick the most useful message out of an error body: `detail`, then the
/// first field-specific message, then the raw JSON.
pub fn extract_error_message(body: &Value) -> String {
    match body {
        Value::String(s) if !s.trim().is_empty() => return s.clone(),
        Value::Object(map) => {
            if let Some(Value::String(detail)) = map.get("detail") {
                return detail.clone();
            }
            if let Some(message) = map.get("non_field_errors").and_then(first_message) {
                return message;
            }
            for (field, value) in map {
                if let Some(message) = first_message(value) {
                    return format!("{}: {}", field, message);
                }
            }
        }
        _ => {}
    }
    body.to_string()
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}
