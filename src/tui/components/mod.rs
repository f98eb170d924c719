//! Reusable UI components for the terminal UI

pub mod form_field;
pub mod record_table;
pub mod status_display;

pub use form_field::{Form, FormField};
pub use record_table::RecordTable;
pub use status_display::StatusDisplay;
