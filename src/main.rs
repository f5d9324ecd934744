use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use relayd::config::{builtin_formats, format_for_path};
use relayd::lifecycle::signals;
use relayd::registry::builtin::register_builtin;
use relayd::{FeatureRegistry, InstanceBuilder, LifecycleController};

/// Modular proxy runtime.
#[derive(Parser)]
#[command(name = "relayd", version)]
struct Cli {
    /// Path to the configuration file.
    config: PathBuf,

    /// Configuration format; inferred from the file extension when omitted.
    #[arg(long)]
    format: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    relayd::observability::logging::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relayd starting");

    let mut registry = FeatureRegistry::new();
    register_builtin(&mut registry)?;

    let formats = builtin_formats()?;
    let format = cli
        .format
        .clone()
        .unwrap_or_else(|| format_for_path(&cli.config).to_string());
    let config = formats.load_file(&format, &cli.config)?;

    tracing::info!(
        format = %format,
        apps = config.apps.len(),
        outbounds = config.outbounds.len(),
        inbounds = config.inbounds.len(),
        "configuration loaded"
    );

    let instance = InstanceBuilder::new(&registry).build(&config)?;
    let mut controller = LifecycleController::new(instance);
    controller.start().await?;

    // Termination listeners exist only after a successful start.
    let signal = signals::wait_for_shutdown().await?;
    tracing::info!(signal, "termination requested, shutting down");
    signals::force_exit_on_next_signal();

    if let Err(err) = controller.close().await {
        tracing::warn!(error = %err, "shutdown finished with errors");
    }

    tracing::info!("shutdown complete");
    Ok(())
}
