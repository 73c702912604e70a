use std::path::{Path, PathBuf};

use crossterm::event::KeyCode;
use labelkit_core::commands::launch::SpawnedTools;
use labelkit_core::commands::split::SplitOpts;
use labelkit_core::config::DashboardConfig;
use labelkit_core::events::Event;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::dispatch;

/// Which screen the sidebar has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Workbench,
}

/// Application phase.
///
/// - `Idle`: no request running, actions available
/// - `Running`: a launch or split request is executing, live updates shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Running,
}

/// Severity of an activity log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Warning,
    Error,
}

/// One line in the activity log.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub kind: LogKind,
    pub text: String,
}

/// Top-level application state.
pub struct App {
    pub view: View,
    pub state: AppState,
    quit: bool,
    /// Whether the launch action is currently available. Toggled by
    /// `ActionEnabled` events from the core.
    pub action_enabled: bool,
    /// Current status line, including any busy-indicator suffix.
    pub status_text: String,
    /// Progress of the active request, `(completed, total)`.
    pub progress: Option<(usize, usize)>,
    /// Warnings and errors collected during requests.
    pub log: Vec<LogLine>,
    /// Lines scrolled up from the bottom of the log.
    pub log_scroll: usize,
    /// Outcome of the most recently finished request.
    pub last_success: Option<bool>,

    pub config: DashboardConfig,
    pub app_dir: PathBuf,
    /// Source dataset for the split action (from --source).
    pub split_source: Option<PathBuf>,
    /// Output base for the split action (from --output).
    pub split_output: Option<PathBuf>,
    pub split_seed: Option<u64>,

    pub spawned: SpawnedTools,
    /// Event channel of the running request, `None` when idle.
    pub rx: Option<UnboundedReceiver<Event>>,
}

impl App {
    pub fn new(config: DashboardConfig, app_dir: PathBuf) -> Self {
        Self {
            view: View::Home,
            state: AppState::Idle,
            quit: false,
            action_enabled: true,
            status_text: String::new(),
            progress: None,
            log: Vec::new(),
            log_scroll: 0,
            last_success: None,
            config,
            app_dir,
            split_source: None,
            split_output: None,
            split_seed: None,
            spawned: SpawnedTools::default(),
            rx: None,
        }
    }

    /// Returns true if the app should exit.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// The launch action is available only while idle and not disabled by
    /// the core.
    pub fn can_launch(&self) -> bool {
        self.action_enabled && self.state == AppState::Idle
    }

    /// Handle a key press event.
    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Esc => self.handle_esc(),
            KeyCode::Char('h') => self.view = View::Home,
            KeyCode::Char('w') => self.view = View::Workbench,
            KeyCode::Char('l') => self.start_launch(),
            KeyCode::Char('s') => self.start_split(),
            KeyCode::Up => self.log_scroll = self.log_scroll.saturating_add(1).min(self.log.len()),
            KeyCode::Down => self.log_scroll = self.log_scroll.saturating_sub(1),
            KeyCode::Home => self.log_scroll = self.log.len(),
            KeyCode::End => self.log_scroll = 0,
            _ => {}
        }
    }

    fn handle_esc(&mut self) {
        match self.view {
            View::Workbench => self.view = View::Home,
            // Requests are not cancellable; Esc in Home quits.
            View::Home => self.quit = true,
        }
    }

    /// Start a launch request unless one is running or the action is gated.
    pub fn start_launch(&mut self) {
        if !self.can_launch() {
            return;
        }
        self.begin_request();
        self.rx = Some(dispatch::spawn_launch(
            self.config.clone(),
            self.app_dir.clone(),
            self.spawned.clone(),
        ));
    }

    /// Start a split request for the configured source directory.
    pub fn start_split(&mut self) {
        if self.state == AppState::Running {
            return;
        }
        let Some(source) = self.split_source.clone() else {
            self.push_log(
                LogKind::Warning,
                "No dataset configured: start with --source <dir>".to_string(),
            );
            return;
        };
        let output_base = match self.split_output.clone().or_else(|| {
            source.parent().map(Path::to_path_buf)
        }) {
            Some(dir) => dir,
            None => {
                self.push_log(
                    LogKind::Error,
                    "Source directory has no parent to place the output in".to_string(),
                );
                return;
            }
        };

        self.begin_request();
        self.rx = Some(dispatch::spawn_split(SplitOpts {
            source,
            output_base,
            ratio: self.config.split.ratio,
            seed: self.split_seed,
        }));
    }

    fn begin_request(&mut self) {
        self.state = AppState::Running;
        self.progress = None;
        self.last_success = None;
        self.log_scroll = 0;
    }

    /// Apply one core event to the UI state.
    pub fn apply_event(&mut self, event: Event) {
        match event {
            Event::Status(text) => self.status_text = text,
            Event::Warning(text) => self.push_log(LogKind::Warning, text),
            Event::Error(text) => {
                for line in text.lines() {
                    self.push_log(LogKind::Error, line.to_string());
                }
            }
            Event::Progress { completed, total, .. } => self.progress = Some((completed, total)),
            Event::ActionEnabled(enabled) => self.action_enabled = enabled,
            Event::TaskStarted { .. } => {}
            Event::TaskFinished { success, .. } => self.last_success = Some(success),
        }
    }

    /// The running request's channel closed: the worker is done.
    pub fn request_finished(&mut self) {
        self.rx = None;
        self.state = AppState::Idle;
    }

    fn push_log(&mut self, kind: LogKind, text: String) {
        self.log.push(LogLine { kind, text });
    }
}
