//! # Termination signals.
//!
//! [`wait_for_termination`] completes on the first termination request and
//! reports which one arrived, so the runtime can log it.
//!
//! - Unix: `SIGINT`, `SIGTERM`, `SIGQUIT`
//! - elsewhere: Ctrl-C via [`tokio::signal::ctrl_c`]

use std::fmt;

/// Termination request received from the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Termination {
    Interrupt,
    Terminate,
    Quit,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::Interrupt => "SIGINT",
            Termination::Terminate => "SIGTERM",
            Termination::Quit => "SIGQUIT",
        })
    }
}

/// Waits for a termination signal. Fails only if listeners cannot be registered.
#[cfg(unix)]
pub(crate) async fn wait_for_termination() -> std::io::Result<Termination> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let received = tokio::select! {
        _ = sigint.recv() => Termination::Interrupt,
        _ = sigterm.recv() => Termination::Terminate,
        _ = sigquit.recv() => Termination::Quit,
    };
    Ok(received)
}

/// Waits for a termination signal. Fails only if listeners cannot be registered.
#[cfg(not(unix))]
pub(crate) async fn wait_for_termination() -> std::io::Result<Termination> {
    tokio::signal::ctrl_c().await?;
    Ok(Termination::Interrupt)
}
