//! Executor startup.

use super::wait_for_termination;
use crate::profile::ProfileContext;
use crate::units::unit_registry;
use gatehouse_config_and_utils::{Config, Paths};
use method_shuttle::{RemoteExecutor, ShuttleService};
use std::sync::Arc;
use tracing::info;

/// Run the remote executor of one execution context.
pub async fn run_executor(mut config: Config, paths: Paths, context: Option<String>) -> anyhow::Result<()> {
    if let Some(context) = context {
        config.execution_context = context;
        config.validate()?;
    }
    let name = config.execution_context.clone();
    paths.ensure_dirs()?;

    let profile = Arc::new(ProfileContext::new(&name, &config.known_targets));
    let executor = Arc::new(RemoteExecutor::new(unit_registry(), profile));
    let service = ShuttleService::new(paths.shuttle_socket_file(&name), executor);
    info!(context = %name, targets = config.known_targets.len(), "Executor started");

    let shutdown = service.shutdown_sender();
    tokio::spawn(async move {
        wait_for_termination().await;
        let _ = shutdown.send(());
    });

    service.run().await?;
    info!(context = %name, "Executor stopped");
    Ok(())
}
