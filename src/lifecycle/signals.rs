//! OS signal handling.
//!
//! # Responsibilities
//! - Install termination handlers (SIGINT, and SIGTERM on unix)
//! - Bridge asynchronous signal delivery into the control path
//!
//! # Design Decisions
//! - Handlers are installed on first use, after a successful start; a
//!   failed bootstrap never has a termination listener
//! - One signal produces an orderly close; a second one, armed by the
//!   entrypoint during shutdown, forces an immediate exit

/// Block until the first termination request and return its name.
#[cfg(unix)]
pub async fn wait_for_shutdown() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok("interrupt")
        }
        _ = terminate.recv() => Ok("terminate"),
    }
}

/// Block until the first termination request and return its name.
#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("interrupt")
}

/// Arm a watcher that force-exits on the next termination request.
///
/// Called after the first signal, so an operator can cut a hung shutdown
/// short instead of waiting on a stuck stop hook.
pub fn force_exit_on_next_signal() {
    tokio::spawn(async {
        if wait_for_shutdown().await.is_ok() {
            tracing::error!("second termination signal received, forcing exit");
            std::process::exit(1);
        }
    });
}
