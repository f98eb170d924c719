//! schooldesk - client for a school management REST API
//!
//! Generic list views over the backend's collections, a command layer that
//! announces which collections changed, derived fee/timetable/dashboard
//! views, and two front ends: a command line tool and a terminal UI.

pub mod aggregate;
pub mod api;
pub mod commands;
pub mod config;
pub mod export;
pub mod models;
pub mod session;
pub mod tui;
pub mod view;
