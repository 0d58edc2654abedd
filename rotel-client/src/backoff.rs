//! Connection state and the reconnect state machine.
//!
//! [`ReconnectMachine`] owns the backoff delay and decides the next
//! [`ConnectionState`] from receive-loop events, so the cap and reset rules
//! can be exercised without a socket.

use std::fmt;
use std::time::Duration;

/// Lifecycle state of a client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out the given delay before the next connect attempt
    Reconnecting(Duration),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// The pending delay while reconnecting
    pub fn reconnect_delay(&self) -> Option<Duration> {
        match self {
            ConnectionState::Reconnecting(delay) => Some(*delay),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting(delay) => write!(f, "reconnecting in {delay:?}"),
        }
    }
}

/// Doubling delay between a floor and a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(floor);
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Return the delay to wait now and double the next one, capped at the ceiling.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    /// The delay the next failure will wait
    pub fn peek(&self) -> Duration {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

/// Inputs to the reconnect state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectEvent {
    ReadSucceeded,
    ReadFailed,
    ConnectSucceeded,
    ConnectFailed,
    CloseRequested,
}

/// Backoff bookkeeping for the receive loop.
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    backoff: Backoff,
}

impl ReconnectMachine {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            state: ConnectionState::Connected,
            backoff: Backoff::new(floor, ceiling),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The delay the next read failure will wait
    pub fn next_delay(&self) -> Duration {
        self.backoff.peek()
    }

    /// Apply an event and return the resulting state.
    ///
    /// Only a successful read resets the delay: a connect that succeeds but
    /// is dropped again before any data arrives keeps backing off.
    pub fn handle(&mut self, event: ReconnectEvent) -> ConnectionState {
        self.state = match event {
            ReconnectEvent::ReadSucceeded => {
                self.backoff.reset();
                ConnectionState::Connected
            }
            ReconnectEvent::ReadFailed => ConnectionState::Reconnecting(self.backoff.advance()),
            ReconnectEvent::ConnectSucceeded => ConnectionState::Connected,
            ReconnectEvent::ConnectFailed => ConnectionState::Disconnected,
            ReconnectEvent::CloseRequested => {
                self.backoff.reset();
                ConnectionState::Disconnected
            }
        };
        self.state
    }
}
