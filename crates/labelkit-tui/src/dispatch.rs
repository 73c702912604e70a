use std::path::PathBuf;

use labelkit_core::commands::launch::SpawnedTools;
use labelkit_core::commands::split::SplitOpts;
use labelkit_core::config::DashboardConfig;
use labelkit_core::events::{Event, StatusBus};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// Spawn a launch request as a background task.
///
/// Returns the receiver the event loop drains. When the channel closes
/// (task finished, bus dropped), the request is over.
pub fn spawn_launch(
    config: DashboardConfig,
    app_dir: PathBuf,
    spawned: SpawnedTools,
) -> UnboundedReceiver<Event> {
    let (bus, rx) = StatusBus::channel();
    info!("dispatching launch request");
    tokio::spawn(async move {
        let _ = labelkit_core::commands::launch::run(&config, app_dir, bus, spawned).await;
    });
    rx
}

/// Spawn a split request as a background task.
pub fn spawn_split(opts: SplitOpts) -> UnboundedReceiver<Event> {
    let (bus, rx) = StatusBus::channel();
    info!(source = %opts.source.display(), "dispatching split request");
    tokio::spawn(async move {
        let _ = labelkit_core::commands::split::run(opts, bus).await;
    });
    rx
}
