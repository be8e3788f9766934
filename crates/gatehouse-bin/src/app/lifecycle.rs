//! Controller lifecycle management (stop, status).

use gatehouse_config_and_utils::{Config, Paths};
use gatehouse_ipc::ApiClient;
use std::path::Path;

fn read_pid(pid_path: &Path) -> Option<i32> {
    std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|pid| pid.trim().parse::<i32>().ok())
}

fn send_signal(pid: i32, signal: libc::c_int) -> bool {
    // SAFETY: kill has no memory-safety preconditions; a stale pid only
    // makes it fail with ESRCH.
    unsafe { libc::kill(pid, signal) == 0 }
}

/// Stop the controller.
pub async fn stop_controller(paths: &Paths) -> anyhow::Result<()> {
    let socket_path = paths.api_socket_file();
    let pid_path = paths.pid_file();

    if !socket_path.exists() {
        println!("Controller is not running (socket not found)");
        if pid_path.exists() {
            let _ = std::fs::remove_file(&pid_path);
        }
        return Ok(());
    }

    let Some(pid) = read_pid(&pid_path) else {
        let _ = std::fs::remove_file(&socket_path);
        println!("No PID file, cleaned up stale socket file");
        return Ok(());
    };

    if send_signal(pid, libc::SIGTERM) {
        println!("Controller shutdown initiated");
    } else {
        println!("Failed to signal PID {}", pid);
    }

    // Wait for the controller to stop (up to 3 seconds)
    for _ in 0..30 {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        if !socket_path.exists() {
            println!("Controller stopped");
            return Ok(());
        }
    }

    println!(
        "Controller did not stop gracefully, sending SIGKILL to PID {}",
        pid
    );
    send_signal(pid, libc::SIGKILL);
    let _ = std::fs::remove_file(&socket_path);
    let _ = std::fs::remove_file(&pid_path);
    println!("Controller killed");

    Ok(())
}

/// Check controller and executor status.
pub async fn check_status(config: &Config, paths: &Paths) -> anyhow::Result<()> {
    let socket_path = paths.api_socket_file();

    if !socket_path.exists() {
        println!("Controller is not running (socket not found)");
    } else if ApiClient::new(&socket_path).is_server_running().await {
        println!("Controller is running");
        if let Some(pid) = read_pid(&paths.pid_file()) {
            println!("  PID:     {}", pid);
        }
        println!("  Socket:  {}", socket_path.display());
    } else {
        println!("Controller is not responding");
        println!("Socket may be stale: {}", socket_path.display());
    }

    let shuttle_socket = paths.shuttle_socket_file(&config.execution_context);
    let executor_state = if !shuttle_socket.exists() {
        "not running"
    } else if tokio::net::UnixStream::connect(&shuttle_socket).await.is_ok() {
        "running"
    } else {
        "not responding"
    };
    println!(
        "Executor ({}): {}",
        config.execution_context, executor_state
    );

    Ok(())
}
