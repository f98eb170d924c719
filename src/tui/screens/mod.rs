//! Screens of the terminal front end

pub mod dashboard;
pub mod help;
pub mod list;
pub mod login;
pub mod menu;

pub use dashboard::DashboardScreen;
pub use help::HelpScreen;
pub use list::ListScreen;
pub use login::LoginScreen;
pub use menu::MenuScreen;
