//! Main TUI application state and logic

use anyhow::Result;
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::components::StatusDisplay;
use super::handlers::CommonKeyHandler;
use super::screens::*;
use super::traits::ScreenAction;
use super::ui::{centered_rect, Styles};
use crate::aggregate::{load_dashboard, FetchMode};
use crate::api::errors::SESSION_EXPIRED;
use crate::api::{ApiClient, SchoolApi};
use crate::commands::CommandBus;
use crate::config::Config;
use crate::export::export_to_path;
use crate::models::{Resource, User};
use crate::session::{AuthState, Session, SessionStore};
use crate::view::{ListViewController, LoadState};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Application screens
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Login,
    Dashboard,
    Menu,
    List,
    Help,
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Screen::Login => "Sign in",
            Screen::Dashboard => "Dashboard",
            Screen::Menu => "Menu",
            Screen::List => "Collection",
            Screen::Help => "Help",
        }
    }
}

/// Main TUI application state
pub struct App {
    /// Current active screen
    pub current_screen: Screen,
    /// Previous screen for navigation
    pub previous_screen: Option<Screen>,
    pub config: Config,
    session: Session,
    bus: CommandBus,

    // Screen states
    pub login: LoginScreen,
    pub dashboard: DashboardScreen,
    pub menu: MenuScreen,
    pub list: ListScreen,
    pub help: HelpScreen,

    pub status: StatusDisplay,
    pub should_quit: bool,
    pub show_help_popup: bool,
}

impl App {
    /// Create the application against the configured backend
    pub fn new(config: Config) -> Result<Self> {
        let session = Session::load(SessionStore::new(&config.session_file));
        let client = Arc::new(ApiClient::new(&config, session.clone())?);
        Ok(Self::with_api(config, session, client))
    }

    pub fn with_api(config: Config, session: Session, api: Arc<dyn SchoolApi>) -> Self {
        Self {
            current_screen: Screen::Login,
            previous_screen: None,
            login: LoginScreen::new(&config.api_url),
            dashboard: DashboardScreen::new(config.poll_interval()),
            menu: MenuScreen::new(),
            list: ListScreen::new(),
            help: HelpScreen::new(),
            config,
            session,
            bus: CommandBus::new(api),
            status: StatusDisplay::new(),
            should_quit: false,
            show_help_popup: false,
        }
    }

    fn api(&self) -> Arc<dyn SchoolApi> {
        self.bus.api()
    }

    /// Run the main application loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.start().await;

        loop {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(TICK_RATE)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key).await;
                    }
                }
            }

            self.tick(Instant::now()).await;

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Decide the first screen from the stored session
    pub async fn start(&mut self) {
        let api = self.api();
        match self.session.resolve(api.as_ref()).await {
            AuthState::Authenticated(user) => {
                info!("Resumed session for {}", user.username);
                self.enter_dashboard(user).await;
            }
            AuthState::Unauthenticated => self.current_screen = Screen::Login,
            AuthState::Error(message) => {
                warn!("Could not resolve the current user: {}", message);
                self.login.reset(Some(message));
                self.current_screen = Screen::Login;
            }
        }
    }

    /// Periodic work between key presses
    pub async fn tick(&mut self, now: Instant) {
        self.status.tick(now);
        match self.current_screen {
            Screen::Dashboard if self.dashboard.is_refresh_due(now) => {
                self.refresh_dashboard().await;
            }
            Screen::List => {
                if let Some(controller) = self.list.controller.as_mut() {
                    controller.sync().await;
                }
                self.check_session();
            }
            _ => {}
        }
    }

    fn captures_text(&self) -> bool {
        match self.current_screen {
            Screen::Login => true,
            Screen::List => self.list.captures_text(),
            _ => false,
        }
    }

    /// Handle keyboard input events
    pub async fn handle_key_event(&mut self, key: KeyEvent) {
        if let Some(action) = CommonKeyHandler::handle_global_keys(key, self.captures_text()) {
            self.apply(action).await;
            return;
        }

        if self.show_help_popup {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?')) {
                self.show_help_popup = false;
            }
            return;
        }

        let help_key = key.code == KeyCode::F(1) || (key.code == KeyCode::Char('?') && !self.captures_text());
        if help_key && self.current_screen != Screen::Help {
            self.show_help_popup = true;
            return;
        }

        let action = match self.current_screen {
            Screen::Login => self.login.handle_key(key),
            Screen::Dashboard => self.dashboard.handle_key(key),
            Screen::Menu => self.menu.handle_key(key),
            Screen::List => self.list.handle_key(key),
            Screen::Help => self.help.handle_key(key),
        };
        self.apply(action).await;
    }

    /// Carry out what a screen asked for
    pub async fn apply(&mut self, action: ScreenAction) {
        match action {
            ScreenAction::None => {}
            ScreenAction::NavigateTo(screen) => self.navigate_to_screen(screen),
            ScreenAction::NavigateBack => {
                let target = self.previous_screen.clone().unwrap_or(Screen::Menu);
                self.navigate_to_screen(target);
            }
            ScreenAction::Quit => self.should_quit = true,
            ScreenAction::SetStatus(message) => self.status.set_info(message),
            ScreenAction::SetError(message) => self.status.set_error(message),
            ScreenAction::ClearMessages => self.status.clear(),
            ScreenAction::Login { username, password } => self.login(&username, &password).await,
            ScreenAction::Logout => self.logout(),
            ScreenAction::RefreshDashboard => self.refresh_dashboard().await,
            ScreenAction::OpenResource(resource) => self.open_resource(resource).await,
            ScreenAction::RefreshList => self.refresh_list().await,
            ScreenAction::SubmitForm => self.submit_form().await,
            ScreenAction::ConfirmDelete => self.confirm_delete().await,
            ScreenAction::ExportList => self.export_list(),
        }
        self.check_session();
    }

    /// Navigate to a specific screen
    pub fn navigate_to_screen(&mut self, screen: Screen) {
        if screen == self.current_screen {
            return;
        }
        self.previous_screen = Some(self.current_screen.clone());
        self.current_screen = screen;
        self.status.clear();
    }

    async fn login(&mut self, username: &str, password: &str) {
        self.login.is_submitting = true;
        let api = self.api();
        match api.login(username, password).await {
            Ok(user) => {
                info!("Logged in as {}", user.username);
                self.status.set_success(format!("Signed in as {}", user.username));
                self.login.reset(None);
                self.enter_dashboard(user).await;
            }
            Err(e) => {
                warn!("Login failed for {}: {}", username, e);
                self.login.reset(Some(e.user_message()));
            }
        }
    }

    async fn enter_dashboard(&mut self, user: User) {
        self.menu.set_role(&user.role);
        self.dashboard.user = Some(user);
        self.previous_screen = None;
        self.current_screen = Screen::Dashboard;
        self.refresh_dashboard().await;
    }

    fn logout(&mut self) {
        self.session.invalidate();
        self.reset_to_login(None);
        self.status.set_info("Signed out".to_string());
    }

    fn reset_to_login(&mut self, reason: Option<String>) {
        self.dashboard.reset();
        self.list.close();
        self.login.reset(reason);
        self.previous_screen = None;
        self.current_screen = Screen::Login;
        self.show_help_popup = false;
    }

    /// Send the user back to the login screen after a 401
    fn check_session(&mut self) {
        let expired = self
            .list
            .controller
            .as_ref()
            .map_or(false, |c| c.needs_login());
        if expired {
            self.expire_session();
        }
    }

    fn expire_session(&mut self) {
        info!("Session expired, returning to login");
        self.session.invalidate();
        self.reset_to_login(Some(SESSION_EXPIRED.to_string()));
    }

    async fn refresh_dashboard(&mut self) {
        let api = self.api();
        let today = Local::now().date_naive();
        let result = load_dashboard(api.as_ref(), FetchMode::Lenient, today).await;
        let now = Instant::now();
        match result {
            Ok(data) => self.dashboard.apply(Ok(data), now),
            Err(e) if e.is_unauthorized() => self.expire_session(),
            Err(e) => {
                warn!("Dashboard refresh failed: {}", e);
                self.dashboard.apply(Err(e.user_message()), now);
            }
        }
    }

    async fn open_resource(&mut self, resource: Resource) {
        debug!("Opening {}", resource);
        let controller = ListViewController::new(self.bus.clone(), resource, self.config.view.page_size);
        self.list.open(controller);
        self.navigate_to_screen(Screen::List);
        self.refresh_list().await;
    }

    async fn refresh_list(&mut self) {
        let Some(controller) = self.list.controller.as_mut() else {
            return;
        };
        controller.refresh().await;
        match controller.load_state() {
            LoadState::Loaded => self
                .status
                .set_info(format!("{} records", controller.records().len())),
            LoadState::Failed(message) => self.status.set_error(message.clone()),
            _ => {}
        }
    }

    async fn submit_form(&mut self) {
        let Some(controller) = self.list.controller.as_mut() else {
            return;
        };
        if controller.submit().await {
            self.status.set_success("Saved".to_string());
        }
        self.list.sync_dialog();
    }

    async fn confirm_delete(&mut self) {
        let Some(controller) = self.list.controller.as_mut() else {
            return;
        };
        if controller.confirm_delete().await {
            self.status.set_success("Deleted".to_string());
        } else if let Some(banner) = controller.banner() {
            self.status.set_error(banner.to_string());
        }
    }

    fn export_list(&mut self) {
        let Some(controller) = self.list.controller.as_ref() else {
            return;
        };
        let resource = controller.resource();
        let path = PathBuf::from(format!("{}.csv", resource.as_str()));
        match export_to_path(&path, resource, &controller.filtered()) {
            Ok(count) => self
                .status
                .set_success(format!("Exported {} rows to {}", count, path.display())),
            Err(e) => self.status.set_error(format!("Export failed: {:#}", e)),
        }
    }

    /// Draw the UI
    pub fn draw(&mut self, f: &mut Frame) {
        let size = f.size();

        // Main layout: status bar at bottom, content area above
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        match self.current_screen {
            Screen::Login => self.login.draw(f, chunks[0]),
            Screen::Dashboard => self.dashboard.draw(f, chunks[0]),
            Screen::Menu => self.menu.draw(f, chunks[0]),
            Screen::List => self.list.draw(f, chunks[0]),
            Screen::Help => self.help.draw(f, chunks[0]),
        }

        let hint = format!(
            "schooldesk - {} | ESC: Back | Ctrl+C: Quit | F1/?: Help",
            self.current_screen.title()
        );
        self.status.render(f, chunks[1], &hint);

        if self.show_help_popup {
            self.draw_help_popup(f, size);
        }
    }

    fn draw_help_popup(&self, f: &mut Frame, area: Rect) {
        let popup_area = centered_rect(70, 60, area);
        f.render_widget(Clear, popup_area);

        let popup = Paragraph::new(self.context_help())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Help - Context Shortcuts")
                    .borders(Borders::ALL)
                    .border_style(Styles::warning()),
            );
        f.render_widget(popup, popup_area);
    }

    fn context_help(&self) -> String {
        let global_help = "Global Shortcuts:\n\
            ESC - Go back\n\
            Ctrl+C - Quit application\n\
            F1 / ? - Toggle this help\n\n";

        let screen_help = match self.current_screen {
            Screen::Login => {
                "Sign in:\n\
                Tab - Next field\n\
                Enter - Sign in\n\
                Esc - Quit"
            }
            Screen::Dashboard => {
                "Dashboard:\n\
                r - Refresh now\n\
                Enter / m - Menu\n\
                l - Log out"
            }
            Screen::Menu => {
                "Menu:\n\
                ↑/↓ - Navigate menu\n\
                Enter - Open"
            }
            Screen::List => {
                "Collection:\n\
                ↑/↓ - Select row\n\
                ←/→ - Change page\n\
                / - Search, c - Clear search\n\
                n - New, e - Edit, d - Delete\n\
                r - Reload, x - Export CSV"
            }
            Screen::Help => {
                "Help Screen:\n\
                ↑/↓ - Switch sections\n\
                Page Up/Down - Scroll"
            }
        };

        format!("{}{}", global_help, screen_help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{Failure, InMemoryApi};
    use crate::models::Role;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn admin() -> User {
        User {
            id: 1,
            username: "admin".to_string(),
            email: None,
            role: Role::SchoolAdmin,
            school_name: Some("Hillside".to_string()),
        }
    }

    fn app(api: Arc<InMemoryApi>, token: Option<&str>) -> App {
        App::with_api(
            Config::default(),
            Session::in_memory(token.map(str::to_string)),
            api,
        )
    }

    #[tokio::test]
    async fn test_starts_on_login_without_a_token() {
        let api = Arc::new(InMemoryApi::new());
        let mut app = app(api, None);
        app.start().await;
        assert_eq!(app.current_screen, Screen::Login);

        // typing a q into the username field does not quit
        app.handle_key_event(key(KeyCode::Char('q'))).await;
        assert!(!app.should_quit);
        assert_eq!(app.login.form.value("username"), Some("q"));

        app.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
            .await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_stored_token_resumes_on_dashboard() {
        let api = Arc::new(InMemoryApi::new());
        api.set_user(Some(admin()));
        api.seed_named(Resource::Students, "Student", 4);
        let mut app = app(api, Some("token"));

        app.start().await;
        assert_eq!(app.current_screen, Screen::Dashboard);
        assert_eq!(app.dashboard.data.as_ref().map(|d| d.students), Some(4));
        assert!(app.menu.items.len() > 3);
    }

    #[tokio::test]
    async fn test_login_then_open_collection() {
        let api = Arc::new(InMemoryApi::new());
        api.set_user(Some(admin()));
        api.seed_named(Resource::Classes, "Class", 12);
        let mut app = app(api, None);
        app.start().await;

        app.apply(ScreenAction::Login {
            username: "admin".to_string(),
            password: "pw".to_string(),
        })
        .await;
        assert_eq!(app.current_screen, Screen::Dashboard);

        app.apply(ScreenAction::OpenResource(Resource::Classes)).await;
        assert_eq!(app.current_screen, Screen::List);
        let controller = app.list.controller.as_ref().unwrap();
        assert_eq!(controller.records().len(), 12);
        assert_eq!(controller.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_bad_credentials_stay_on_login() {
        let api = Arc::new(InMemoryApi::new());
        api.set_user(Some(admin()));
        let mut app = app(api, None);

        app.apply(ScreenAction::Login {
            username: "nobody".to_string(),
            password: "pw".to_string(),
        })
        .await;
        assert_eq!(app.current_screen, Screen::Login);
        assert_eq!(
            app.login.error.as_deref(),
            Some("No active account found with the given credentials")
        );
    }

    #[tokio::test]
    async fn test_unauthorized_list_returns_to_login() {
        let api = Arc::new(InMemoryApi::new());
        api.set_user(Some(admin()));
        api.fail(Resource::Subjects, Failure::Unauthorized);
        let mut app = app(api, Some("token"));
        app.start().await;
        assert_eq!(app.current_screen, Screen::Dashboard);

        app.apply(ScreenAction::OpenResource(Resource::Subjects)).await;
        assert_eq!(app.current_screen, Screen::Login);
        assert_eq!(app.login.error.as_deref(), Some(SESSION_EXPIRED));
        assert!(app.list.controller.is_none());
        assert!(!app.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_dashboard() {
        let api = Arc::new(InMemoryApi::new());
        api.set_user(Some(admin()));
        let mut app = app(api, Some("token"));
        app.start().await;
        assert!(app.dashboard.data.is_some());

        app.handle_key_event(key(KeyCode::Char('l'))).await;
        assert_eq!(app.current_screen, Screen::Login);
        assert!(app.dashboard.data.is_none());
        assert!(!app.session.is_authenticated());
    }
}
