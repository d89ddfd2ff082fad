//! Signal handling: dispatching `-s stop|reload` to another running
//! instance, and this instance's own `SIGINT`/`SIGHUP` loop. Grounded on
//! `original_source/server/proxy.go`'s `Stop`/`Reload`/signal-`Notify` loop.
//! `tokio::signal::unix` is used instead of a `ctrlc`-style crate because
//! `ctrlc` only covers `SIGINT`, and a config reload needs `SIGHUP` too.

use log::info;
use tokio::signal::unix::{signal, SignalKind};

use crate::cli::Signal;

/// Send `signal` to the process named by `pid` (SIGINT for stop, SIGHUP for
/// reload), matching `Proxy.Stop`/`Proxy.Reload`.
pub fn dispatch(pid: i32, signal: Signal) -> std::io::Result<()> {
    let sig = match signal {
        Signal::Stop => libc::SIGINT,
        Signal::Reload => libc::SIGHUP,
    };
    let result = unsafe { libc::kill(pid, sig) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

pub enum Event {
    Stop,
    Reload,
}

/// Waits for the next `SIGINT` or `SIGHUP` this process receives. Intended
/// to be called in a loop from `main`'s control flow.
pub async fn next_event() -> Event {
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
            Event::Stop
        }
        _ = sighup.recv() => {
            info!("received SIGHUP, reloading configuration");
            Event::Reload
        }
    }
}
