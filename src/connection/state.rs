//! Connection lifecycle state machine.
//!
//! ```text
//! Disconnected --Connect--> Connecting --Opened--> Ready
//!      ^                        |                    |
//!      +--------Closed----------+-------Closed-------+
//!
//! any --LoggedOut--> LoggedOut (terminal, needs re-pairing)
//! ```
//!
//! The current state is published through a `tokio::sync::watch` channel so
//! request handlers can read readiness without locking.

use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    /// The session was revoked; reconnecting is pointless until re-paired.
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connect,
    Opened,
    Closed,
    LoggedOut,
}

impl ConnectionState {
    pub fn on(self, event: ConnectionEvent) -> Self {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self, event) {
            (S::LoggedOut, _) | (_, E::LoggedOut) => S::LoggedOut,
            (S::Disconnected, E::Connect) => S::Connecting,
            (S::Connecting | S::Ready, E::Connect) => self,
            (_, E::Opened) => S::Ready,
            (_, E::Closed) => S::Disconnected,
        }
    }

    pub fn is_ready(self) -> bool {
        self == ConnectionState::Ready
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::LoggedOut
    }
}

/// Shared, observable connection state.
#[derive(Debug)]
pub struct ConnectionStatus {
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionStatus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Apply `event` and return the resulting state.
    ///
    /// Transitions are logged only when the state actually changes.
    pub fn apply(&self, event: ConnectionEvent) -> ConnectionState {
        let mut next = ConnectionState::Disconnected;
        self.tx.send_if_modified(|state| {
            let previous = *state;
            next = previous.on(event);
            if next == previous {
                return false;
            }
            tracing::info!(from = ?previous, to = ?next, ?event, "connection state changed");
            *state = next;
            true
        });
        next
    }

    #[cfg(test)]
    fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionEvent as E;
    use ConnectionState as S;

    #[test]
    fn happy_path_reaches_ready() {
        let state = S::Disconnected.on(E::Connect).on(E::Opened);
        assert_eq!(state, S::Ready);
        assert!(state.is_ready());
    }

    #[test]
    fn close_from_ready_drops_back_to_disconnected() {
        assert_eq!(S::Ready.on(E::Closed), S::Disconnected);
        assert_eq!(S::Connecting.on(E::Closed), S::Disconnected);
    }

    #[test]
    fn logged_out_is_terminal() {
        let state = S::Ready.on(E::LoggedOut);
        assert!(state.is_terminal());
        assert_eq!(state.on(E::Connect), S::LoggedOut);
        assert_eq!(state.on(E::Opened), S::LoggedOut);
    }

    #[test]
    fn connect_while_ready_is_ignored() {
        assert_eq!(S::Ready.on(E::Connect), S::Ready);
    }

    #[tokio::test]
    async fn status_publishes_changes_to_subscribers() {
        let status = ConnectionStatus::new();
        let mut rx = status.subscribe();

        status.apply(E::Connect);
        status.apply(E::Opened);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), S::Ready);
        assert!(status.current().is_ready());
    }
}
