use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::config::DashboardConfig;
use crate::events::{Event, StatusBus};
use crate::process::{ProcessHandle, ProcessMonitor, ProcessSpec};
use crate::provision::{ProvisionError, Provisioner};

/// Environment overrides forcing UTF-8 text encoding in the child.
pub const UTF8_ENV: &[(&str, &str)] = &[
    ("PYTHONUTF8", "1"),
    ("PYTHONIOENCODING", "utf-8"),
    ("LC_ALL", "C.UTF-8"),
    ("LANG", "C.UTF-8"),
];

/// Grace period between the termination request and the hard kill.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles of annotation-tool processes this instance spawned, shared with
/// the shutdown path. Shutdown drains it and terminates each entry.
#[derive(Clone, Default)]
pub struct SpawnedTools(Arc<Mutex<Vec<ProcessHandle>>>);

impl SpawnedTools {
    pub fn register(&self, handle: ProcessHandle) {
        self.0.lock().expect("spawned list poisoned").push(handle);
    }

    pub fn drain(&self) -> Vec<ProcessHandle> {
        std::mem::take(&mut *self.0.lock().expect("spawned list poisoned"))
    }

    /// Terminate every registered process, gracefully then by force,
    /// proceeding regardless of outcome. Called when the owning frontend
    /// shuts down.
    pub async fn shutdown(&self, bus: &StatusBus) {
        let monitor = ProcessMonitor::new(bus.clone());
        for handle in self.drain() {
            monitor.terminate(&handle, SHUTDOWN_TIMEOUT).await;
        }
    }
}

/// One launch request: provision the environment if needed, then start the
/// annotation tool and supervise it until it exits.
///
/// Everything observable flows through the bus; the returned `Result` only
/// distinguishes "request completed its reporting" from a caller-level bug,
/// so frontends can surface an exit code without double-reporting.
pub async fn run(
    config: &DashboardConfig,
    app_dir: PathBuf,
    bus: StatusBus,
    spawned: SpawnedTools,
) -> Result<()> {
    bus.emit(Event::TaskStarted {
        name: "launch".to_string(),
    });
    bus.status(format!("Starting {}", config.tool.executable));
    bus.start_busy();

    let provisioner = Provisioner::new(
        bus.clone(),
        app_dir.clone(),
        config.env.clone(),
        config.tool.clone(),
    );

    let report = match provisioner.ensure_tool().await {
        Ok(report) => report,
        Err(ProvisionError::AlreadyRunning(name)) => {
            bus.warning(format!(
                "Environment '{name}' is already provisioning; request ignored"
            ));
            return finish(&bus, false);
        }
        Err(_) => {
            // The state machine already reported the failure and disabled
            // the action.
            return finish(&bus, false);
        }
    };

    info!(tool = %report.tool_path.display(), steps = report.steps_run, "provisioning done");

    let port = config.tool.port.to_string();
    let mut spec = ProcessSpec::new(&report.tool_path)
        .args(["--port", port.as_str()])
        .current_dir(&app_dir);
    for (key, value) in UTF8_ENV {
        spec = spec.env(*key, *value);
    }

    let monitor = ProcessMonitor::new(bus.clone());
    let process = match monitor.spawn(&spec) {
        Ok(process) => process,
        Err(e) => {
            bus.error(format!(
                "Failed to start {}: {e}",
                config.tool.executable
            ));
            bus.emit(Event::ActionEnabled(true));
            return finish(&bus, false);
        }
    };
    spawned.register(process.handle());

    bus.status(format!(
        "{} running on localhost:{}",
        config.tool.executable, config.tool.port
    ));
    bus.stop_busy();

    // Supervise until the tool exits; wait() reports the outcome.
    let outcome = monitor.wait(process).await;
    finish(&bus, outcome.success())
}

fn finish(bus: &StatusBus, success: bool) -> Result<()> {
    bus.stop_busy();
    bus.emit(Event::TaskFinished {
        name: "launch".to_string(),
        success,
    });
    Ok(())
}
