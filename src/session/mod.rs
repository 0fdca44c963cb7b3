//! Interactive session controller.
//!
//! The [`Controller`] owns navigation state and reacts to one [`Event`] at a
//! time. Slow work (network calls, clones, test runs) runs on background
//! threads which report back by sending events into the same channel the
//! terminal loop drains.

mod menu;
mod view;

pub use menu::{Menu, MenuAction, VariantAction, VariantChoice, VariantMenu, VariantMode};
pub use view::render;

use crate::auth::TokenProvider;
use crate::cancel::CancelFlag;
use crate::catalog::{distinct_names, variants_named, CatalogClient, Project};
use crate::download::{CloneProgress, ProjectDownloader};
use crate::error::KataError;
use crate::registry::DownloadRegistry;
use crate::report::TestRunReport;
use crate::state::{State, StateMachine};
use crate::testrun::TestExecutor;
use crate::workspace::Workspace;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

/// Test output lines kept for display while a run is in progress.
const MAX_TEST_OUTPUT_LINES: usize = 200;

/// Which flow a catalog fetch was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Download,
    Test,
}

impl Flow {
    fn name_state(&self) -> State {
        match self {
            Flow::Download => State::ProjectNameMenu,
            Flow::Test => State::TestProjectNameMenu,
        }
    }

    fn variant_state(&self) -> State {
        match self {
            Flow::Download => State::ProjectVariantMenu,
            Flow::Test => State::TestProjectVariantMenu,
        }
    }

    fn variant_mode(&self) -> VariantMode {
        match self {
            Flow::Download => VariantMode::Download,
            Flow::Test => VariantMode::Test,
        }
    }
}

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Tick,
    TokenRefreshed,
    TokenRefreshFailed(KataError),
    LoggedIn,
    LoginFailed(KataError),
    CatalogLoaded { flow: Flow, projects: Vec<Project> },
    CatalogFailed { flow: Flow, error: KataError },
    CloneProgress(CloneProgress),
    CloneComplete { project_id: u64, path: PathBuf },
    CloneFailed(KataError),
    TestProgress(String),
    TestComplete(TestRunReport),
    TestFailed(KataError),
    ResultsSynced,
    ResultsSyncFailed(KataError),
    InvalidTransition(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    Download,
    Test,
    LogOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    pub submitting: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            focus: LoginField::Email,
            submitting: false,
        }
    }
}

impl LoginForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }
}

/// Mutable data shown by the screens.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub selected_project: Option<Project>,
    pub selected_variant: Option<String>,
    /// Download progress in `[0, 1]`.
    pub progress: f64,
    pub status: Option<String>,
    pub error: Option<String>,
    pub report: Option<TestRunReport>,
    pub test_output: Vec<String>,
    pub results_scroll: u16,
}

/// External collaborators injected into the controller.
pub struct Services {
    pub catalog: Arc<dyn CatalogClient>,
    pub tokens: Arc<dyn TokenProvider>,
    pub downloader: Arc<dyn ProjectDownloader>,
    pub tests: Arc<dyn TestExecutor>,
    pub registry: DownloadRegistry,
    pub workspace: Workspace,
}

pub struct Controller {
    machine: StateMachine,
    session: SessionState,
    services: Services,
    tx: SyncSender<Event>,
    cancel: CancelFlag,
    main_menu: Menu<MainAction>,
    name_menu: Menu<String>,
    variant_menu: VariantMenu,
    login: LoginForm,
    catalog: Vec<Project>,
    catalog_loading: bool,
    clone_in_flight: bool,
    test_in_flight: bool,
    should_quit: bool,
}

impl Controller {
    pub fn new(services: Services, tx: SyncSender<Event>) -> Self {
        let machine = StateMachine::for_session(services.tokens.has_credentials());
        Self {
            machine,
            session: SessionState::default(),
            services,
            tx,
            cancel: CancelFlag::new(),
            main_menu: Menu::new(vec![
                ("Download a project".to_string(), MainAction::Download),
                ("Test a project".to_string(), MainAction::Test),
                ("Log out".to_string(), MainAction::LogOut),
            ]),
            name_menu: Menu::default(),
            variant_menu: VariantMenu::new(VariantMode::Download),
            login: LoginForm::default(),
            catalog: Vec::new(),
            catalog_loading: false,
            clone_in_flight: false,
            test_in_flight: false,
            should_quit: false,
        }
    }

    /// Kick off work required by the initial state.
    pub fn start(&mut self) {
        if self.machine.current() == State::RefreshingToken {
            let tokens = Arc::clone(&self.services.tokens);
            self.spawn(move || match tokens.get_token() {
                Ok(_) => Event::TokenRefreshed,
                Err(e) => Event::TokenRefreshFailed(e),
            });
        }
    }

    // ------------------------------------------------------------------
    // Accessors used by the view
    // ------------------------------------------------------------------

    pub fn state(&self) -> State {
        self.machine.current()
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn main_menu(&self) -> &Menu<MainAction> {
        &self.main_menu
    }

    pub fn name_menu(&self) -> &Menu<String> {
        &self.name_menu
    }

    pub fn variant_menu(&self) -> &VariantMenu {
        &self.variant_menu
    }

    pub fn login_form(&self) -> &LoginForm {
        &self.login
    }

    pub fn catalog_loading(&self) -> bool {
        self.catalog_loading
    }

    pub fn clone_in_flight(&self) -> bool {
        self.clone_in_flight
    }

    pub fn test_in_flight(&self) -> bool {
        self.test_in_flight
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        tracing::info!("quitting session");
        self.should_quit = true;
        self.cancel.cancel();
    }

    /// Navigate to a state given by name.
    ///
    /// Unknown names are reported back as [`Event::InvalidTransition`].
    pub fn navigate_to(&mut self, name: &str) {
        if self.machine.transition_named(name).is_err() {
            tracing::warn!(name, "rejected transition");
            let _ = self.tx.try_send(Event::InvalidTransition(name.to_string()));
        }
    }

    // ------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Tick => {}
            Event::TokenRefreshed => {
                if self.state() == State::RefreshingToken {
                    self.session.error = None;
                    self.machine.reset_to(State::MainMenu);
                }
            }
            Event::TokenRefreshFailed(error) => {
                tracing::warn!(%error, "token refresh failed");
                self.machine.reset_to(State::Login);
                self.session.error = Some(error.to_string());
            }
            Event::LoggedIn => {
                self.login = LoginForm::default();
                self.session.error = None;
                self.machine.reset_to(State::MainMenu);
            }
            Event::LoginFailed(error) => {
                tracing::warn!(%error, "login failed");
                self.login.submitting = false;
                self.login.password.clear();
                self.session.error = Some(error.to_string());
            }
            Event::CatalogLoaded { flow, projects } => self.on_catalog_loaded(flow, projects),
            Event::CatalogFailed { flow, error } => {
                self.catalog_loading = false;
                tracing::warn!(?flow, %error, "catalog fetch failed");
                if matches!(error, KataError::Unauthorized) {
                    self.machine.reset_to(State::Login);
                }
                self.session.error = Some(error.to_string());
            }
            Event::CloneProgress(progress) => {
                if self.clone_in_flight {
                    self.session.progress = self.session.progress.max(progress.fraction);
                    if progress.label.is_some() {
                        self.session.status = progress.label;
                    }
                }
            }
            Event::CloneComplete { project_id, path } => self.on_clone_complete(project_id, path),
            Event::CloneFailed(error) => {
                self.clone_in_flight = false;
                if !matches!(error, KataError::Cancelled) {
                    tracing::warn!(%error, "download failed");
                    self.session.status = None;
                    self.session.error = Some(error.to_string());
                }
            }
            Event::TestProgress(line) => {
                self.session.test_output.push(line.clone());
                let overflow = self
                    .session
                    .test_output
                    .len()
                    .saturating_sub(MAX_TEST_OUTPUT_LINES);
                self.session.test_output.drain(..overflow);
                self.session.status = Some(line);
            }
            Event::TestComplete(report) => self.on_test_complete(report),
            Event::TestFailed(error) => {
                self.test_in_flight = false;
                if !matches!(error, KataError::Cancelled) {
                    tracing::warn!(%error, "test run failed");
                    self.session.status = None;
                    self.session.error = Some(error.to_string());
                }
            }
            Event::ResultsSynced => {
                self.session.status = Some("Results saved".to_string());
            }
            Event::ResultsSyncFailed(error) => {
                tracing::warn!(%error, "failed to save results");
                self.session.error = Some(format!("Could not save results: {}", error));
            }
            Event::InvalidTransition(name) => {
                self.session.error = Some(KataError::InvalidTransition(name).to_string());
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        let before = self.state();
        if key.code == KeyCode::Char('q') && before != State::Login {
            self.quit();
            return;
        }

        match before {
            State::RefreshingToken => {}
            State::Login => self.handle_login_key(key.code),
            State::MainMenu => self.handle_main_menu_key(key.code),
            State::ProjectNameMenu => self.handle_name_menu_key(Flow::Download, key.code),
            State::TestProjectNameMenu => self.handle_name_menu_key(Flow::Test, key.code),
            State::ProjectVariantMenu | State::TestProjectVariantMenu => {
                self.handle_variant_key(key.code)
            }
            State::TestProject => self.handle_results_key(key.code),
        }

        if self.state() != before {
            self.session.error = None;
        }
    }

    // ------------------------------------------------------------------
    // Per-state key handlers
    // ------------------------------------------------------------------

    fn handle_login_key(&mut self, key: KeyCode) {
        if self.login.submitting {
            return;
        }
        match key {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.toggle_focus()
            }
            KeyCode::Char(c) => self.login.focused_mut().push(c),
            KeyCode::Backspace => {
                self.login.focused_mut().pop();
            }
            KeyCode::Enter => self.submit_login(),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        let email = self.login.email.trim().to_string();
        let password = self.login.password.clone();
        if email.is_empty() || password.is_empty() {
            self.session.error = Some("Email and password are required".to_string());
            return;
        }

        self.login.submitting = true;
        self.session.error = None;
        let tokens = Arc::clone(&self.services.tokens);
        self.spawn(move || match tokens.login(&email, &password) {
            Ok(()) => Event::LoggedIn,
            Err(e) => Event::LoginFailed(e),
        });
    }

    fn handle_main_menu_key(&mut self, key: KeyCode) {
        match self.main_menu.handle_key(key) {
            MenuAction::Selected(MainAction::Download) => self.open_flow(Flow::Download),
            MenuAction::Selected(MainAction::Test) => self.open_flow(Flow::Test),
            MenuAction::Selected(MainAction::LogOut) => self.log_out(),
            MenuAction::None | MenuAction::Back => {}
        }
    }

    fn open_flow(&mut self, flow: Flow) {
        self.machine.transition(flow.name_state());
        self.name_menu.clear();
        self.catalog.clear();
        self.catalog_loading = true;

        let catalog = Arc::clone(&self.services.catalog);
        self.spawn(move || match catalog.list_projects() {
            Ok(projects) => Event::CatalogLoaded { flow, projects },
            Err(error) => Event::CatalogFailed { flow, error },
        });
    }

    fn log_out(&mut self) {
        if let Err(e) = self.services.tokens.logout() {
            self.session.error = Some(e.to_string());
            return;
        }
        tracing::info!("logged out");
        self.login = LoginForm::default();
        self.machine.reset_to(State::Login);
    }

    fn handle_name_menu_key(&mut self, flow: Flow, key: KeyCode) {
        match self.name_menu.handle_key(key) {
            MenuAction::Selected(name) => {
                if !self.clone_in_flight {
                    self.session.progress = 0.0;
                }
                let choices = self.variant_choices(flow, &name);
                self.variant_menu.set_choices(flow.variant_mode(), choices);
                self.machine.transition(flow.variant_state());
            }
            MenuAction::Back => {
                self.machine.go_back();
            }
            MenuAction::None => {}
        }
    }

    fn handle_variant_key(&mut self, key: KeyCode) {
        match self.variant_menu.handle_key(key) {
            VariantAction::Start(choice) => match self.variant_menu.mode() {
                VariantMode::Download => self.start_download(choice),
                VariantMode::Test => self.start_test_run(choice),
            },
            VariantAction::Open(choice) => {
                let dir = self.services.workspace.project_dir(&choice.project);
                if !self.services.workspace.open_in_file_browser(&dir) {
                    self.session.error = Some(format!("Could not open {}", dir.display()));
                }
            }
            VariantAction::Back => {
                self.machine.go_back();
            }
            VariantAction::None => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.session.results_scroll = self.session.results_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.session.results_scroll = self.session.results_scroll.saturating_add(1);
            }
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Left => {
                self.machine.reset_to(State::MainMenu);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    fn downloaded(&self, project_id: u64) -> bool {
        match self.services.registry.is_downloaded(project_id) {
            Ok(downloaded) => downloaded,
            Err(e) => {
                tracing::warn!(error = %e, "could not read download registry");
                false
            }
        }
    }

    fn variant_choices(&self, flow: Flow, name: &str) -> Vec<VariantChoice> {
        variants_named(&self.catalog, name)
            .into_iter()
            .map(|(project, variant)| VariantChoice {
                downloaded: self.downloaded(project.id),
                project: project.clone(),
                variant,
            })
            .filter(|choice| flow == Flow::Download || choice.downloaded)
            .collect()
    }

    fn on_catalog_loaded(&mut self, flow: Flow, projects: Vec<Project>) {
        self.catalog_loading = false;
        if self.state() != flow.name_state() {
            tracing::debug!(?flow, "discarding catalog for inactive flow");
            return;
        }

        let names: Vec<String> = distinct_names(&projects)
            .into_iter()
            .filter(|name| {
                flow == Flow::Download
                    || projects
                        .iter()
                        .any(|p| &p.name == name && self.downloaded(p.id))
            })
            .collect();

        if names.is_empty() && flow == Flow::Test {
            self.session.status = Some("No downloaded projects yet".to_string());
        }
        self.name_menu
            .set_items(names.into_iter().map(|n| (n.clone(), n)).collect());
        self.catalog = projects;
    }

    // ------------------------------------------------------------------
    // Download pipeline
    // ------------------------------------------------------------------

    fn start_download(&mut self, choice: VariantChoice) {
        if self.clone_in_flight {
            self.session.error = Some("A download is already in progress".to_string());
            return;
        }

        tracing::info!(project_id = choice.project.id, variant = %choice.variant, "starting download");
        self.clone_in_flight = true;
        self.session.error = None;
        self.session.progress = 0.0;
        self.session.status = Some("Starting download".to_string());
        self.session.selected_project = Some(choice.project.clone());
        self.session.selected_variant = Some(choice.variant.clone());

        let downloader = Arc::clone(&self.services.downloader);
        let cancel = self.cancel.clone();
        let tx = self.tx.clone();
        let progress_tx = self.tx.clone();
        std::thread::spawn(move || {
            let mut on_progress = |progress: CloneProgress| {
                // Only the latest value matters, so drop updates when the queue is full.
                let _ = progress_tx.try_send(Event::CloneProgress(progress));
            };
            let event = match downloader.download_project(
                &choice.project,
                &choice.variant,
                &mut on_progress,
                &cancel,
            ) {
                Ok(path) => Event::CloneComplete {
                    project_id: choice.project.id,
                    path,
                },
                Err(e) => Event::CloneFailed(e),
            };
            let _ = tx.send(event);
        });
    }

    fn on_clone_complete(&mut self, project_id: u64, path: PathBuf) {
        self.clone_in_flight = false;
        self.session.progress = 1.0;
        self.session.status = Some(format!("Downloaded to {}", path.display()));

        if let Err(e) = self.services.registry.mark_downloaded(project_id) {
            self.session.error = Some(format!("Could not record download: {}", e));
        }
        self.variant_menu.mark_downloaded(project_id);

        let catalog = Arc::clone(&self.services.catalog);
        std::thread::spawn(move || {
            if let Err(e) = catalog.initialize_project(project_id) {
                tracing::warn!(project_id, error = %e, "failed to initialize project");
            }
        });
    }

    // ------------------------------------------------------------------
    // Test pipeline
    // ------------------------------------------------------------------

    fn start_test_run(&mut self, choice: VariantChoice) {
        if self.test_in_flight {
            self.session.error = Some("A test run is already in progress".to_string());
            return;
        }

        tracing::info!(project_id = choice.project.id, variant = %choice.variant, "starting test run");
        self.test_in_flight = true;
        self.session.error = None;
        self.session.report = None;
        self.session.test_output.clear();
        self.session.results_scroll = 0;
        self.session.status = Some("Running tests".to_string());
        self.session.selected_project = Some(choice.project.clone());
        self.session.selected_variant = Some(choice.variant.clone());

        let tests = Arc::clone(&self.services.tests);
        let cancel = self.cancel.clone();
        let tx = self.tx.clone();
        let progress_tx = self.tx.clone();
        std::thread::spawn(move || {
            let mut on_progress = |line: String| {
                let _ = progress_tx.try_send(Event::TestProgress(line));
            };
            let event = match tests.run_tests(
                &choice.project,
                &choice.variant,
                &mut on_progress,
                &cancel,
            ) {
                Ok(report) => Event::TestComplete(report),
                Err(e) => Event::TestFailed(e),
            };
            let _ = tx.send(event);
        });
    }

    fn on_test_complete(&mut self, report: TestRunReport) {
        self.test_in_flight = false;
        self.session.status = Some(format!(
            "{} passed, {} failed",
            report.passed_tests.len(),
            report.failed_tests.len()
        ));

        if let Some(project) = &self.session.selected_project {
            let catalog = Arc::clone(&self.services.catalog);
            let project_id = project.id;
            let failed = report.failed_tests.clone();
            let passed = report.passed_tests.clone();
            self.spawn(move || {
                match catalog.bulk_update_test_results(&failed, &passed, project_id) {
                    Ok(()) => Event::ResultsSynced,
                    Err(e) => Event::ResultsSyncFailed(e),
                }
            });
        }

        self.session.report = Some(report);
        self.session.results_scroll = 0;
        match self.state() {
            State::TestProject => {}
            State::Login | State::RefreshingToken => {
                tracing::info!("test results arrived while signed out; staying on login");
            }
            _ => self.machine.transition(State::TestProject),
        }
    }

    /// Run `job` on a background thread and deliver its event.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() -> Event + Send + 'static,
    {
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let _ = tx.send(job());
        });
    }
}
