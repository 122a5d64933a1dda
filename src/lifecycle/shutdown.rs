//! Shutdown coordination.
//!
//! The service has two terminal triggers: an OS signal (default mode) and the exit of the
//! wrapped process (wrap mode). Whichever fires first is recorded; later triggers are ignored.

use std::process::ExitCode;

use tokio::sync::watch;

/// The event that ends the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEvent {
    /// Interrupt or termination signal delivered to this process.
    Signal,
    /// The wrapped process exited with this code.
    ChildExited(i32),
}

impl TerminalEvent {
    /// Exit code the service should terminate with.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            TerminalEvent::Signal => ExitCode::SUCCESS,
            TerminalEvent::ChildExited(code) => match u8::try_from(*code) {
                Ok(code) => ExitCode::from(code),
                Err(_) => ExitCode::FAILURE,
            },
        }
    }
}

/// Coordinator for shutdown.
///
/// Holds at most one [`TerminalEvent`]; every waiter observes the same one.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<Option<TerminalEvent>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Record a terminal event. Returns `false` if another event already won.
    pub fn trigger(&self, event: TerminalEvent) -> bool {
        let won = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(event);
            true
        });
        if won {
            tracing::info!(?event, "Shutdown triggered");
        } else {
            tracing::debug!(?event, "Ignoring terminal event after shutdown");
        }
        won
    }

    /// The winning event, if shutdown has been triggered.
    pub fn event(&self) -> Option<TerminalEvent> {
        *self.tx.borrow()
    }

    /// Wait until shutdown is triggered, returning the winning event.
    pub async fn wait(&self) -> TerminalEvent {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(event) = *rx.borrow_and_update() {
                return event;
            }
            // The sender lives in `self`, so the channel cannot close while we wait.
            if rx.changed().await.is_err() {
                return TerminalEvent::Signal;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_event_wins() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.event(), None);

        assert!(shutdown.trigger(TerminalEvent::ChildExited(3)));
        assert!(!shutdown.trigger(TerminalEvent::Signal));
        assert_eq!(shutdown.event(), Some(TerminalEvent::ChildExited(3)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TerminalEvent::Signal.exit_code(), ExitCode::SUCCESS);
        assert_eq!(TerminalEvent::ChildExited(0).exit_code(), ExitCode::SUCCESS);
        assert_eq!(TerminalEvent::ChildExited(3).exit_code(), ExitCode::from(3));
        assert_eq!(TerminalEvent::ChildExited(-1).exit_code(), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_late_waiter_sees_event() {
        let shutdown = Shutdown::new();
        shutdown.trigger(TerminalEvent::Signal);
        assert_eq!(shutdown.wait().await, TerminalEvent::Signal);
    }

    #[tokio::test]
    async fn test_waiters_wake_on_trigger() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger(TerminalEvent::ChildExited(7));

        let event = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, TerminalEvent::ChildExited(7));
    }
}
