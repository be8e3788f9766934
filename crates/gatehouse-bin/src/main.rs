//! Gatehouse - authenticated API controller with cross-context execution.

mod app;
mod controller;
mod platform;
mod profile;
mod units;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gatehouse_config_and_utils::{init_logging, init_logging_for_service, parse_level, Config, Paths};

/// Gatehouse command-line interface.
#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(about = "Authenticated target control across execution contexts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true, env = "GATEHOUSE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base directory for runtime files (sockets, logs, config). Defaults to ~/.gatehouse
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller
    Serve {
        /// Execute work units in this process instead of a separate executor
        #[arg(long)]
        in_process: bool,
    },
    /// Run the executor of an execution context
    Executor {
        /// Execution context name. Defaults to the configured context
        #[arg(short, long)]
        context: Option<String>,
    },
    /// Send one API request to the controller
    Call {
        /// Action name (e.g. suspend-targets)
        action: String,
        /// Targets to address
        targets: Vec<String>,
        /// Use the multi-target scheme even for a single target
        #[arg(long)]
        multi: bool,
        /// Caller package to declare
        #[arg(long)]
        caller_package: Option<String>,
        /// Creator package of a capability token
        #[arg(long)]
        token_package: Option<String>,
        /// Creator uid of the capability token
        #[arg(long, requires = "token_package")]
        token_uid: Option<i64>,
    },
    /// Stop the controller
    Stop,
    /// Check controller and executor status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    let level = parse_level(cli.log_level.as_deref().unwrap_or(&config.log_level))
        .as_str()
        .to_lowercase();

    match cli.command {
        Commands::Serve { in_process } => {
            init_logging_for_service("controller", &level, &paths);
            app::run_controller(config, paths, in_process).await?;
        }
        Commands::Executor { context } => {
            let service = format!(
                "executor:{}",
                context.as_deref().unwrap_or(&config.execution_context)
            );
            init_logging_for_service(&service, &level, &paths);
            app::run_executor(config, paths, context).await?;
        }
        Commands::Call {
            action,
            targets,
            multi,
            caller_package,
            token_package,
            token_uid,
        } => {
            init_logging(&level);
            app::call(
                &paths,
                app::CallArgs {
                    action,
                    targets,
                    multi,
                    caller_package,
                    token_package,
                    token_uid,
                },
            )
            .await?;
        }
        Commands::Stop => {
            init_logging(&level);
            app::stop_controller(&paths).await?;
        }
        Commands::Status => {
            init_logging(&level);
            app::check_status(&config, &paths).await?;
        }
    }

    Ok(())
}
