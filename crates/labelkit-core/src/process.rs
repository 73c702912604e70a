use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::StatusBus;

/// Process creation failed before the child ever ran.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("executable not found: {0}")]
    MissingExecutable(PathBuf),
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Description of one external process invocation.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Program path or bare name resolved via PATH.
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Environment overrides applied on top of the inherited environment.
    pub env: HashMap<String, String>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Human-readable command line for status text and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Result of a completed child process.
#[derive(Debug, Clone)]
pub struct ExitOutcome {
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Cloneable reference to a spawned child, sufficient for termination.
///
/// The owning worker keeps the [`ManagedProcess`]; the handle is what the
/// shutdown path holds on to.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pub pid: Option<u32>,
    pub name: String,
}

/// A child process under supervision, exclusively owned by the worker that
/// spawned it. Output is drained concurrently with the wait so a full pipe
/// buffer can never deadlock the child.
#[derive(Debug)]
pub struct ManagedProcess {
    child: Child,
    name: String,
    pid: Option<u32>,
    stdout_task: JoinHandle<String>,
    stderr_task: JoinHandle<String>,
}

impl ManagedProcess {
    pub fn handle(&self) -> ProcessHandle {
        ProcessHandle {
            pid: self.pid,
            name: self.name.clone(),
        }
    }
}

/// Spawns and supervises external processes, reporting through the bus.
#[derive(Clone)]
pub struct ProcessMonitor {
    bus: StatusBus,
}

impl ProcessMonitor {
    pub fn new(bus: StatusBus) -> Self {
        Self { bus }
    }

    /// Spawn a child process, announcing it on the bus.
    ///
    /// Fails with [`LaunchError`] if an absolute program path does not exist
    /// or the OS rejects process creation. The child is detached from any
    /// console the parent owns and placed in its own process group so it can
    /// be targeted for termination independently of the parent.
    pub fn spawn(&self, spec: &ProcessSpec) -> Result<ManagedProcess, LaunchError> {
        self.bus.status(format!("Running {}", spec.display()));
        self.spawn_quiet(spec)
    }

    /// Spawn without announcing; used by `run_step` where the caller owns
    /// the status narrative.
    fn spawn_quiet(&self, spec: &ProcessSpec) -> Result<ManagedProcess, LaunchError> {
        if spec.program.is_absolute() && !spec.program.is_file() {
            return Err(LaunchError::MissingExecutable(spec.program.clone()));
        }

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = spec.working_dir {
            cmd.current_dir(dir);
        }

        // Own process group, so termination never reaches the parent.
        #[cfg(unix)]
        cmd.process_group(0);
        // No console window; own group for taskkill targeting.
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NO_WINDOW | CREATE_NEW_PROCESS_GROUP);
        }

        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            command: spec.display(),
            source,
        })?;

        // safety: we set Stdio::piped() above so these are always Some
        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");

        let name = spec
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| spec.program.display().to_string());

        let stdout_task = tokio::spawn(drain_lines(BufReader::new(stdout), name.clone(), false));
        let stderr_task = tokio::spawn(drain_lines(BufReader::new(stderr), name.clone(), true));

        let pid = child.id();
        debug!(name = %name, pid = ?pid, "spawned child process");

        Ok(ManagedProcess {
            child,
            name,
            pid,
            stdout_task,
            stderr_task,
        })
    }

    /// Suspend the calling worker until the child exits, then report the
    /// outcome: an error event carrying captured stderr on a non-zero exit,
    /// a status event on a clean one.
    pub async fn wait(&self, process: ManagedProcess) -> ExitOutcome {
        let outcome = self.wait_quiet(process.child, process.stdout_task, process.stderr_task).await;
        match outcome.code {
            Some(0) => self.bus.status(format!("{} exited", process.name)),
            Some(code) => self.bus.error(format!(
                "{} exited with code {code}: {}",
                process.name,
                tail(&outcome.stderr)
            )),
            None => self
                .bus
                .error(format!("{} was terminated by a signal", process.name)),
        }
        outcome
    }

    async fn wait_quiet(
        &self,
        mut child: Child,
        stdout_task: JoinHandle<String>,
        stderr_task: JoinHandle<String>,
    ) -> ExitOutcome {
        let status = child.wait().await;
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let code = match status {
            Ok(status) => status.code(),
            Err(e) => {
                warn!("wait on child failed: {e}");
                None
            }
        };
        ExitOutcome { code, stdout, stderr }
    }

    /// Run one provisioning sub-step to completion, capturing its output
    /// into a per-call buffer. No error events are emitted here: the caller
    /// owns the failure narrative (remediation hints, state transitions) and
    /// reports it exactly once.
    pub async fn run_step(&self, spec: &ProcessSpec) -> Result<ExitOutcome, LaunchError> {
        debug!(command = %spec.display(), "running provisioning step");
        let process = self.spawn_quiet(spec)?;
        Ok(self
            .wait_quiet(process.child, process.stdout_task, process.stderr_task)
            .await)
    }

    /// Request graceful termination, escalating to a hard kill after
    /// `timeout`. Windows terminates the whole tree via `taskkill /T`;
    /// elsewhere the process receives SIGTERM directly, then SIGKILL.
    /// The outcome is reported, never raised.
    pub async fn terminate(&self, handle: &ProcessHandle, timeout: Duration) {
        let Some(pid) = handle.pid else {
            return;
        };
        self.bus
            .status(format!("Stopping {} (pid {pid})", handle.name));

        #[cfg(windows)]
        {
            let _ = timeout;
            let result = Command::new("taskkill")
                .args(["/F", "/T", "/PID", &pid.to_string()])
                .output()
                .await;
            if let Err(e) = result {
                self.bus
                    .warning(format!("Failed to stop {}: {e}", handle.name));
                return;
            }
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(pid as i32);
            if kill(pid, Signal::SIGTERM).is_err() {
                // Already gone.
                self.bus.status(format!("{} stopped", handle.name));
                return;
            }

            let deadline = tokio::time::Instant::now() + timeout;
            while tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(100)).await;
                // Probe with signal 0: ESRCH means the process is gone.
                if kill(pid, None).is_err() {
                    self.bus.status(format!("{} stopped", handle.name));
                    return;
                }
            }

            warn!(pid = %pid, "graceful stop timed out, killing");
            self.bus.warning(format!(
                "{} did not stop within {}s, killing",
                handle.name,
                timeout.as_secs()
            ));
            let _ = kill(pid, Signal::SIGKILL);
        }

        self.bus.status(format!("{} stopped", handle.name));
    }
}

/// Accumulate a pipe into a string, tracing each line as it arrives.
async fn drain_lines<R>(reader: BufReader<R>, name: String, is_stderr: bool) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut captured = String::new();
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(process = %name, stderr = is_stderr, "{line}");
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

/// Last few lines of captured output, for compact error messages.
fn tail(output: &str) -> String {
    const LINES: usize = 5;
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(LINES);
    lines[start..].join("\n")
}
