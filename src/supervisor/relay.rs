//! Signal relay from this process to the wrapped process.
//!
//! # Responsibilities
//! - Take over SIGINT, SIGTERM, SIGHUP and SIGQUIT (Ctrl+C elsewhere)
//! - Hand each received signal to the supervisor over a channel
//! - Deliver a signal to the child process
//!
//! # Design Decisions
//! - Handlers are installed before the child is spawned, so no signal falls back to the
//!   default action (terminating this process) while the child runs
//! - The relay never touches the child handle; only the supervisor does

use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A signal forwarded to the wrapped process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardedSignal {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
}

#[cfg(unix)]
impl ForwardedSignal {
    fn as_raw(self) -> libc::c_int {
        match self {
            ForwardedSignal::Interrupt => libc::SIGINT,
            ForwardedSignal::Terminate => libc::SIGTERM,
            ForwardedSignal::Hangup => libc::SIGHUP,
            ForwardedSignal::Quit => libc::SIGQUIT,
        }
    }
}

/// Installed OS signal listeners, not yet relaying.
#[derive(Debug)]
pub struct SignalRelay {
    #[cfg(unix)]
    streams: UnixStreams,
}

#[cfg(unix)]
#[derive(Debug)]
struct UnixStreams {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

impl SignalRelay {
    /// Install the signal handlers. Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let streams = UnixStreams {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            quit: signal(SignalKind::quit())?,
        };
        Ok(Self { streams })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Relay received signals into `tx` until the receiver is dropped.
    #[cfg(unix)]
    pub fn spawn(self, tx: mpsc::Sender<ForwardedSignal>) -> JoinHandle<()> {
        let mut streams = self.streams;

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = streams.interrupt.recv() => ForwardedSignal::Interrupt,
                    Some(()) = streams.terminate.recv() => ForwardedSignal::Terminate,
                    Some(()) = streams.hangup.recv() => ForwardedSignal::Hangup,
                    Some(()) = streams.quit.recv() => ForwardedSignal::Quit,
                    else => return,
                };

                tracing::info!(signal = ?received, "Relaying signal to wrapped process");
                if tx.send(received).await.is_err() {
                    return;
                }
            }
        })
    }

    #[cfg(not(unix))]
    pub fn spawn(self, tx: mpsc::Sender<ForwardedSignal>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Relaying interrupt to wrapped process");
                if tx.send(ForwardedSignal::Interrupt).await.is_err() {
                    return;
                }
            }
        })
    }
}

/// Deliver `signal` to a running child.
#[cfg(unix)]
pub fn deliver(child: &mut Child, signal: ForwardedSignal) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };
    let pid = libc::pid_t::try_from(pid)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // SAFETY: kill(2) has no memory-safety preconditions; pid belongs to our unreaped child.
    let rc = unsafe { libc::kill(pid, signal.as_raw()) };
    if rc == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Deliver `signal` to a running child. Without POSIX signals this kills the child.
#[cfg(not(unix))]
pub fn deliver(child: &mut Child, _signal: ForwardedSignal) -> std::io::Result<()> {
    child.start_kill()
}
