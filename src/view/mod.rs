//! List view state shared by the CLI and the terminal UI

pub mod controller;
pub mod filter;
pub mod paginate;

pub use controller::{DialogMode, DialogState, ListViewController, LoadState};
