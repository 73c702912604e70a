use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::config::{EnvConfig, ToolConfig};
use crate::events::{Event, StatusBus};
use crate::paths;
use crate::process::{ExitOutcome, LaunchError, ProcessMonitor, ProcessSpec};

/// States of one provisioning run. Transitions are strictly forward except
/// to `Failed`, which is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionState {
    Unchecked,
    EnvMissing,
    EnvCreating,
    DependenciesInstalling,
    ToolInstalling,
    ToolReady,
    Failed(String),
}

impl ProvisionState {
    fn rank(&self) -> u8 {
        match self {
            Self::Unchecked => 0,
            Self::EnvMissing => 1,
            Self::EnvCreating => 2,
            Self::DependenciesInstalling => 3,
            Self::ToolInstalling => 4,
            Self::ToolReady => 5,
            Self::Failed(_) => 6,
        }
    }

    /// Whether `next` is a legal successor of `self`. Skipping forward is
    /// allowed (idempotent fast paths); moving backward or leaving `Failed`
    /// is not.
    pub fn may_advance_to(&self, next: &Self) -> bool {
        if matches!(self, Self::Failed(_)) {
            return false;
        }
        if matches!(next, Self::Failed(_)) {
            return true;
        }
        next.rank() > self.rank()
    }
}

/// A provisioning step failed, or a concurrent run holds the slot.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("already provisioning '{0}'")]
    AlreadyRunning(String),
    #[error("{step} failed: {detail}")]
    Step {
        step: String,
        detail: String,
        stdout: String,
        stderr: String,
        hint: Option<String>,
    },
    #[error("executable missing after install: {0}")]
    ToolMissingAfterInstall(PathBuf),
}

impl ProvisionError {
    /// Full failure text for the bus: message, captured output, hint.
    pub fn report(&self) -> String {
        match self {
            Self::Step {
                stdout,
                stderr,
                hint,
                ..
            } => {
                let mut out = self.to_string();
                if !stdout.trim().is_empty() {
                    out.push_str(&format!("\nstdout: {}", stdout.trim_end()));
                }
                if !stderr.trim().is_empty() {
                    out.push_str(&format!("\nstderr: {}", stderr.trim_end()));
                }
                if let Some(hint) = hint {
                    out.push_str(&format!("\n{hint}"));
                }
                out
            }
            _ => self.to_string(),
        }
    }
}

/// Summary of a finished provisioning run, for callers and tests.
#[derive(Debug)]
pub struct ProvisionReport {
    /// Path of the verified tool executable.
    pub tool_path: PathBuf,
    /// Every state entered, in order, starting with `Unchecked`.
    pub trail: Vec<ProvisionState>,
    /// Number of external provisioning sub-steps that actually ran.
    pub steps_run: usize,
}

/// Tracks the current state, enforcing transition legality and emitting a
/// status event on every entry.
struct StateTracker {
    state: ProvisionState,
    trail: Vec<ProvisionState>,
    bus: StatusBus,
}

impl StateTracker {
    fn new(bus: StatusBus) -> Self {
        Self {
            state: ProvisionState::Unchecked,
            trail: vec![ProvisionState::Unchecked],
            bus,
        }
    }

    fn advance(&mut self, next: ProvisionState) {
        if !self.state.may_advance_to(&next) {
            debug!(?next, current = ?self.state, "ignoring illegal transition");
            return;
        }
        info!(from = ?self.state, to = ?next, "provision state");
        if let ProvisionState::Failed(ref reason) = next {
            self.bus.error(reason.clone());
            self.bus.emit(Event::ActionEnabled(false));
        }
        self.trail.push(next.clone());
        self.state = next;
    }
}

/// Ensures the named runtime environment and tool executable exist,
/// driving the environment manager through the process monitor.
///
/// One instance guards one environment: a second `ensure_tool` call while a
/// run is in flight is rejected immediately with `AlreadyRunning` instead of
/// racing the first.
pub struct Provisioner {
    bus: StatusBus,
    monitor: ProcessMonitor,
    app_dir: PathBuf,
    env: EnvConfig,
    tool: ToolConfig,
    slot: Arc<Mutex<()>>,
}

impl Provisioner {
    pub fn new(bus: StatusBus, app_dir: PathBuf, env: EnvConfig, tool: ToolConfig) -> Self {
        let monitor = ProcessMonitor::new(bus.clone());
        Self {
            bus,
            monitor,
            app_dir,
            env,
            tool,
            slot: Arc::new(Mutex::new(())),
        }
    }

    pub fn env_dir(&self) -> PathBuf {
        paths::env_dir(&self.app_dir, &self.env.name)
    }

    pub fn tool_path(&self) -> PathBuf {
        paths::tool_executable(&self.env_dir(), &self.tool.executable)
    }

    /// Try to claim the single provisioning slot for this environment.
    pub fn try_begin(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.slot).try_lock_owned().ok()
    }

    /// Run the provisioning state machine to completion.
    ///
    /// Fast path: when the environment directory and the tool executable
    /// both exist, no sub-step runs and the report goes straight to
    /// `ToolReady`.
    pub async fn ensure_tool(&self) -> Result<ProvisionReport, ProvisionError> {
        let Some(_permit) = self.try_begin() else {
            return Err(ProvisionError::AlreadyRunning(self.env.name.clone()));
        };
        self.run_machine().await
    }

    async fn run_machine(&self) -> Result<ProvisionReport, ProvisionError> {
        let env_dir = self.env_dir();
        let tool_path = self.tool_path();
        let mut tracker = StateTracker::new(self.bus.clone());
        let mut steps_run = 0usize;

        if paths::tool_installed(&env_dir, &self.tool.executable) {
            self.bus.status(format!(
                "Environment '{}' found, starting {} directly",
                self.env.name, self.tool.executable
            ));
            tracker.advance(ProvisionState::ToolReady);
            self.bus.emit(Event::ActionEnabled(true));
            return Ok(ProvisionReport {
                tool_path,
                trail: tracker.trail,
                steps_run,
            });
        }

        self.bus.status(format!(
            "Environment '{}' not found, provisioning",
            self.env.name
        ));
        self.bus.emit(Event::ActionEnabled(false));
        tracker.advance(ProvisionState::EnvMissing);

        // Query the manager for existing environments.
        self.bus.status("Checking environments");
        let listing = match self
            .run_counted(
                &ProcessSpec::new(&self.env.manager).args(["env", "list"]),
                &mut steps_run,
            )
            .await
        {
            Ok(outcome) if outcome.success() => outcome.stdout,
            result => {
                let err = step_failure(
                    "environment query",
                    result,
                    Some(format!(
                        "Check that {} is installed and on PATH",
                        self.env.manager
                    )),
                );
                tracker.advance(ProvisionState::Failed(err.report()));
                return Err(err);
            }
        };

        tracker.advance(ProvisionState::EnvCreating);
        let interpreter = paths::interpreter_path(&env_dir);
        if !env_listed(&listing, &self.env.name) || !interpreter.is_file() {
            if let Err(err) = self.create_environment(&env_dir, &mut steps_run).await {
                tracker.advance(ProvisionState::Failed(err.report()));
                return Err(err);
            }
        }

        tracker.advance(ProvisionState::DependenciesInstalling);
        if let Err(err) = self
            .install_dependencies(&interpreter, &env_dir, &mut steps_run)
            .await
        {
            tracker.advance(ProvisionState::Failed(err.report()));
            return Err(err);
        }

        if !tool_path.is_file() {
            tracker.advance(ProvisionState::ToolInstalling);
            if let Err(err) = self.install_tool(&interpreter, &mut steps_run).await {
                tracker.advance(ProvisionState::Failed(err.report()));
                return Err(err);
            }
        }

        if !tool_path.is_file() {
            let err = ProvisionError::ToolMissingAfterInstall(tool_path);
            tracker.advance(ProvisionState::Failed(err.report()));
            return Err(err);
        }

        self.bus.status(format!("{} is ready", self.tool.executable));
        tracker.advance(ProvisionState::ToolReady);
        self.bus.emit(Event::ActionEnabled(true));
        Ok(ProvisionReport {
            tool_path: self.tool_path(),
            trail: tracker.trail,
            steps_run,
        })
    }

    async fn create_environment(
        &self,
        env_dir: &Path,
        steps_run: &mut usize,
    ) -> Result<(), ProvisionError> {
        // A stale directory without a working interpreter is deleted before
        // a fresh environment is created in its place.
        if env_dir.exists() {
            self.bus
                .status(format!("Removing stale environment at {}", env_dir.display()));
            std::fs::remove_dir_all(env_dir).map_err(|e| ProvisionError::Step {
                step: "stale environment removal".to_string(),
                detail: e.to_string(),
                stdout: String::new(),
                stderr: String::new(),
                hint: None,
            })?;
        }

        self.bus.status(format!(
            "Creating Python {} environment at {}",
            self.env.python,
            env_dir.display()
        ));
        let spec = ProcessSpec::new(&self.env.manager)
            .args(["create", "-p"])
            .arg(env_dir.display().to_string())
            .arg(format!("python={}", self.env.python))
            .args(["-c", self.env.channel.as_str(), "-y"]);
        let result = self.run_counted(&spec, steps_run).await;
        match result {
            Ok(outcome) if outcome.success() => {
                self.bus.status("Environment created");
                Ok(())
            }
            result => Err(step_failure("environment creation", result, None)),
        }
    }

    async fn install_dependencies(
        &self,
        interpreter: &Path,
        env_dir: &Path,
        steps_run: &mut usize,
    ) -> Result<(), ProvisionError> {
        self.bus.status("Upgrading pip");
        let upgrade = ProcessSpec::new(interpreter).args(["-m", "pip", "install", "--upgrade", "pip"]);
        match self.run_counted(&upgrade, steps_run).await {
            Ok(outcome) if outcome.success() => self.bus.status("pip upgraded"),
            result => return Err(step_failure("pip upgrade", result, None)),
        }

        if self.env.dependencies.is_empty() {
            return Ok(());
        }

        self.bus.status("Installing dependencies");
        let spec = ProcessSpec::new(&self.env.manager)
            .args(["install", "-p"])
            .arg(env_dir.display().to_string())
            .args(["-c", self.env.channel.as_str(), "-y"])
            .args(self.env.dependencies.iter().cloned());
        match self.run_counted(&spec, steps_run).await {
            Ok(outcome) if outcome.success() => {
                self.bus.status("Dependencies installed");
                Ok(())
            }
            result => Err(step_failure(
                "dependency install",
                result,
                Some(build_toolchain_hint(&self.env.manager)),
            )),
        }
    }

    async fn install_tool(
        &self,
        interpreter: &Path,
        steps_run: &mut usize,
    ) -> Result<(), ProvisionError> {
        self.bus
            .status(format!("Installing {}", self.tool.package));
        let spec = ProcessSpec::new(interpreter)
            .args(["-m", "pip", "install"])
            .arg(self.tool.package.clone());
        match self.run_counted(&spec, steps_run).await {
            Ok(outcome) if outcome.success() => {
                self.bus.status(format!("{} installed", self.tool.package));
                Ok(())
            }
            result => Err(step_failure(
                "tool install",
                result,
                Some(build_toolchain_hint(&self.env.manager)),
            )),
        }
    }

    async fn run_counted(
        &self,
        spec: &ProcessSpec,
        steps_run: &mut usize,
    ) -> Result<ExitOutcome, LaunchError> {
        *steps_run += 1;
        self.monitor.run_step(spec).await
    }
}

/// Build a step failure from either a spawn error or a non-zero outcome.
fn step_failure(
    step: &str,
    result: Result<ExitOutcome, LaunchError>,
    hint: Option<String>,
) -> ProvisionError {
    match result {
        Ok(outcome) => ProvisionError::Step {
            step: step.to_string(),
            detail: match outcome.code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by a signal".to_string(),
            },
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            hint,
        },
        Err(e) => ProvisionError::Step {
            step: step.to_string(),
            detail: e.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            hint,
        },
    }
}

/// Platform remediation line appended to install failures.
fn build_toolchain_hint(manager: &str) -> String {
    if cfg!(windows) {
        format!(
            "Microsoft Visual C++ Build Tools are required on Windows: \
             https://visualstudio.microsoft.com/visual-cpp-build-tools/ \
             Alternatively, reinstall the dependencies with {manager}."
        )
    } else {
        format!("A native build toolchain may be required. Alternatively, reinstall the dependencies with {manager}.")
    }
}

/// Whether the manager's `env list` output mentions the named environment.
/// Matches either a `name ` column entry or a path ending in `/name`.
fn env_listed(listing: &str, name: &str) -> bool {
    let by_name = format!("{name} ");
    let by_path = format!("/{name}");
    listing
        .lines()
        .any(|line| line.contains(&by_name) || line.trim_end().ends_with(&by_path))
}
