//! Views derived from several records: fee balances, the weekly timetable
//! and the dashboard overview.

pub mod dashboard;
pub mod fees;
pub mod timetable;

pub use dashboard::{load_dashboard, DashboardData, FetchMode, RefreshTimer};
pub use fees::{summarize_fees, Fee, FeeStatus, FeeSummary};
pub use timetable::{build_grid, ClassFilter, TimetableGrid, TimetableSlot};
