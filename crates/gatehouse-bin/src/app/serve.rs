//! Controller startup.

use super::wait_for_termination;
use crate::controller::ShuttledController;
use crate::platform::{build_trust_cache, StaticPackageRegistry};
use crate::profile::ProfileContext;
use crate::units::unit_registry;
use action_router::{ActionRouter, ApiGateway};
use anyhow::{bail, Context};
use caller_auth::CallerAuthenticator;
use gatehouse_config_and_utils::{Config, Paths};
use gatehouse_ipc::{ApiClient, ApiServer};
use method_shuttle::{
    InProcessChannel, MethodShuttle, RemoteExecutor, ShuttleChannel, UnixSocketChannel,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Run the controller: the API server in front of the gateway.
///
/// With `in_process`, work units execute against a context owned by this
/// process instead of a separate `gatehouse executor`.
pub async fn run_controller(config: Config, paths: Paths, in_process: bool) -> anyhow::Result<()> {
    let socket_path = paths.api_socket_file();
    if socket_path.exists() {
        if ApiClient::new(&socket_path).is_server_running().await {
            bail!("Controller is already running. Use 'gatehouse stop' to stop it first.");
        }
        eprintln!("Removing stale socket file");
        let _ = std::fs::remove_file(&socket_path);
    }

    paths.ensure_dirs()?;
    let pid = std::process::id();
    std::fs::write(paths.pid_file(), pid.to_string()).context("Failed to write PID file")?;
    info!(pid = pid, "Controller started");

    let trust = Arc::new(build_trust_cache(&config)?);
    let registry = Arc::new(StaticPackageRegistry::from_config(&config)?);
    let own_uid = config.own_uid();
    info!(
        own_uid = own_uid,
        trusted = trust.len(),
        execution_context = %config.execution_context,
        "Configuration loaded"
    );
    let authenticator = CallerAuthenticator::new(own_uid, trust, registry);

    let channel: Arc<dyn ShuttleChannel> = if in_process {
        let context = Arc::new(ProfileContext::new(
            &config.execution_context,
            &config.known_targets,
        ));
        let executor = Arc::new(RemoteExecutor::new(unit_registry(), context));
        Arc::new(InProcessChannel::new(executor)?)
    } else {
        let shuttle_socket = paths.shuttle_socket_file(&config.execution_context);
        info!(socket = %shuttle_socket.display(), "Shuttling to executor");
        Arc::new(UnixSocketChannel::new(shuttle_socket))
    };
    let shuttle = MethodShuttle::new(channel, Handle::current());
    let router = ActionRouter::new(Arc::new(ShuttledController::new(shuttle)));
    let gateway = Arc::new(ApiGateway::new(authenticator, router));

    let server = ApiServer::new(&socket_path, move |request, peer_uid| {
        gateway.handle(&request, peer_uid)
    });

    let shutdown = server.shutdown_sender();
    tokio::spawn(async move {
        wait_for_termination().await;
        let _ = shutdown.send(());
    });

    let server_result = server.run().await;

    let _ = std::fs::remove_file(paths.pid_file());
    let _ = std::fs::remove_file(&socket_path);
    info!("Controller stopped");

    server_result.map_err(Into::into)
}
