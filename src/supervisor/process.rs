//! Wrapped process lifecycle.
//!
//! # Responsibilities
//! - Spawn the wrapped command with `PORT` injected into its environment
//! - Forward relayed signals to it
//! - Wait for it to exit and turn the exit into the service's terminal event
//!
//! # States
//! Each lifecycle state is its own type, so a transition consumes the previous one:
//! - Created: [`WrappedProcess`], validated but not spawned
//! - Running: [`RunningProcess`], returned by [`WrappedProcess::start`]
//! - Exited or Killed: [`ProcessState`], returned by [`RunningProcess::supervise`]

use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WrapConfig;
use crate::lifecycle::shutdown::{Shutdown, TerminalEvent};
use crate::supervisor::relay::{self, ForwardedSignal, SignalRelay};

/// Environment variable carrying the assigned port to the child.
pub const PORT_ENV: &str = "PORT";

/// Errors that can occur while setting up the wrapped process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// `wrap` was given without a command.
    #[error("wrap requires a command to run")]
    MissingCommand,

    /// The command could not be started.
    #[error("failed to start {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Signal handlers for the relay could not be installed.
    #[error("failed to install signal relay: {0}")]
    Relay(#[source] std::io::Error),
}

/// Final state of the wrapped process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Exited on its own with this code.
    Exited(i32),
    /// Terminated by this signal.
    Killed(i32),
}

impl ProcessState {
    /// Exit code mirrored by the service: the child's own code, or 1 when it has none.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessState::Exited(code) => *code,
            ProcessState::Killed(_) => 1,
        }
    }
}

impl From<ExitStatus> for ProcessState {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ProcessState::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ProcessState::Killed(signal);
            }
        }
        ProcessState::Exited(1)
    }
}

/// A command to run as the fallback backend, not yet started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedProcess {
    program: String,
    args: Vec<String>,
    port: u16,
}

impl WrappedProcess {
    /// Validate a wrap configuration.
    pub fn new(config: &WrapConfig) -> Result<Self, SupervisorError> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or(SupervisorError::MissingCommand)?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            port: config.port,
        })
    }

    /// Port assigned to the child through `PORT`.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The command line, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn the child with inherited stdio and `PORT` added to the inherited environment.
    ///
    /// The child is killed if the returned handle is dropped before it exits.
    pub fn start(self) -> Result<RunningProcess, SupervisorError> {
        let command = self.command_line();
        let child = Command::new(&self.program)
            .args(&self.args)
            .env(PORT_ENV, self.port.to_string())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                command: command.clone(),
                source,
            })?;

        tracing::info!(
            command = %command,
            pid = ?child.id(),
            port = self.port,
            "Wrapped process started"
        );

        Ok(RunningProcess { child, command })
    }
}

/// A spawned child, exclusively owned by its supervisor.
#[derive(Debug)]
pub struct RunningProcess {
    child: Child,
    command: String,
}

impl RunningProcess {
    /// OS process id of the child.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Forward signals from `signals` until the child exits, then return its final state.
    pub async fn supervise(mut self, mut signals: mpsc::Receiver<ForwardedSignal>) -> ProcessState {
        loop {
            let signal = tokio::select! {
                status = self.child.wait() => {
                    return match status {
                        Ok(status) => ProcessState::from(status),
                        Err(e) => {
                            tracing::error!(command = %self.command, error = %e, "Failed to wait for wrapped process");
                            ProcessState::Exited(1)
                        }
                    };
                }
                Some(signal) = signals.recv() => signal,
            };

            if let Err(e) = relay::deliver(&mut self.child, signal) {
                tracing::warn!(command = %self.command, signal = ?signal, error = %e, "Failed to forward signal");
            }
        }
    }

    /// Relay signals to the child and trigger shutdown when it exits.
    pub fn spawn_supervision(self, relay: SignalRelay, shutdown: Shutdown) -> JoinHandle<ProcessState> {
        let (tx, rx) = mpsc::channel(8);
        let relay_task = relay.spawn(tx);
        let command = self.command.clone();
        let pid = self.pid();

        tokio::spawn(async move {
            let state = self.supervise(rx).await;
            relay_task.abort();

            tracing::info!(command = %command, pid = ?pid, state = ?state, "Wrapped process exited");
            shutdown.trigger(TerminalEvent::ChildExited(state.exit_code()));
            state
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wrap(port: u16, command: &[&str]) -> WrappedProcess {
        WrappedProcess::new(&WrapConfig {
            port,
            command: command.iter().map(|s| s.to_string()).collect(),
        })
        .unwrap()
    }

    fn no_signals() -> mpsc::Receiver<ForwardedSignal> {
        mpsc::channel(1).1
    }

    #[test]
    fn test_missing_command() {
        let err = WrappedProcess::new(&WrapConfig {
            port: 8000,
            command: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(err, SupervisorError::MissingCommand));
    }

    #[test]
    fn test_command_line() {
        let process = wrap(8000, &["node", "server.js", "--verbose"]);
        assert_eq!(process.command_line(), "node server.js --verbose");
        assert_eq!(process.port(), 8000);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = wrap(8000, &["/nonexistent/redirector-test-binary"])
            .start()
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_port_injected() {
        let running = wrap(9123, &["sh", "-c", r#"test "$PORT" = 9123"#]).start().unwrap();
        assert!(running.pid().is_some());
        assert_eq!(running.supervise(no_signals()).await, ProcessState::Exited(0));
    }

    #[tokio::test]
    async fn test_exit_code_mirrored() {
        let running = wrap(9000, &["sh", "-c", "exit 3"]).start().unwrap();
        let state = running.supervise(no_signals()).await;
        assert_eq!(state, ProcessState::Exited(3));
        assert_eq!(state.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_forwarded_signal_kills_child() {
        let running = wrap(9000, &["sleep", "30"]).start().unwrap();
        let (tx, rx) = mpsc::channel(1);
        tx.send(ForwardedSignal::Terminate).await.unwrap();

        let state = tokio::time::timeout(Duration::from_secs(5), running.supervise(rx))
            .await
            .unwrap();
        assert_eq!(state, ProcessState::Killed(libc::SIGTERM));
        assert_eq!(state.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_exit_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let running = wrap(9000, &["sh", "-c", "exit 5"]).start().unwrap();
        let relay = SignalRelay::install().unwrap();

        let handle = running.spawn_supervision(relay, shutdown.clone());
        let event = tokio::time::timeout(Duration::from_secs(5), shutdown.wait())
            .await
            .unwrap();

        assert_eq!(event, TerminalEvent::ChildExited(5));
        assert_eq!(handle.await.unwrap(), ProcessState::Exited(5));
    }
}
