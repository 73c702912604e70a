use std::path::Path;

use anyhow::{Result, bail};
use labelkit_core::commands::launch::SpawnedTools;
use labelkit_core::config::DashboardConfig;
use labelkit_core::events::StatusBus;

use crate::cli::{LaunchArgs, Verbosity};
use crate::render::render_events;

/// Launch the annotation tool, provisioning the environment first if needed.
///
/// Ctrl-C terminates any tool process this invocation spawned (gracefully,
/// then by force) before returning.
pub async fn run(
    config: &DashboardConfig,
    app_dir: &Path,
    args: LaunchArgs,
    verbosity: Verbosity,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(port) = args.port {
        config.tool.port = port;
    }

    let (bus, rx) = StatusBus::channel();
    let renderer = tokio::spawn(render_events(rx, verbosity));
    let spawned = SpawnedTools::default();

    tokio::select! {
        result = labelkit_core::commands::launch::run(
            &config,
            app_dir.to_path_buf(),
            bus.clone(),
            spawned.clone(),
        ) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            bus.status("Shutting down");
            spawned.shutdown(&bus).await;
        }
    }

    drop(bus);
    let saw_error = renderer.await?;
    if saw_error {
        bail!("launch did not complete cleanly");
    }
    Ok(())
}
