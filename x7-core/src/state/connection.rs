//! Connection state machine of a camera session.
//!
//! `ConnectionPhase` models the lifecycle with validated transitions that
//! return `Result` instead of panicking. `ConnectionState` is its plain,
//! copyable projection used in events and queries.

use std::time::Instant;

use crate::error::X7Error;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state as reported to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of a camera session.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected ──► Disconnecting
///       ▲                │              │               │
///       └────────────────┴── (failure) ─┴───────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No socket. Initial and terminal state.
    #[default]
    Disconnected,

    /// Socket opening, pairing, settings sync and preview negotiation.
    Connecting,

    /// Handshake complete; commands and background ticks allowed.
    Connected {
        /// When the session entered the `Connected` state.
        since: Instant,
    },

    /// Normal shutdown in progress.
    Disconnecting,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.state().fmt(f)
    }
}

impl ConnectionPhase {
    pub fn state(&self) -> ConnectionState {
        match self {
            Self::Disconnected => ConnectionState::Disconnected,
            Self::Connecting => ConnectionState::Connecting,
            Self::Connected { .. } => ConnectionState::Connected,
            Self::Disconnecting => ConnectionState::Disconnecting,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the session has been `Connected`; `None` in any other phase.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), X7Error> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(X7Error::Protocol(format!("cannot connect while {self}"))),
        }
    }

    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self) -> Result<(), X7Error> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(X7Error::Protocol(format!(
                "cannot complete connect while {self}"
            ))),
        }
    }

    /// Valid from: `Connected`.
    pub fn begin_disconnect(&mut self) -> Result<(), X7Error> {
        match self {
            Self::Connected { .. } => {
                *self = Self::Disconnecting;
                Ok(())
            }
            _ => Err(X7Error::Protocol(format!(
                "cannot begin disconnect while {self}"
            ))),
        }
    }

    /// Valid from: `Disconnecting`, `Connecting` (failed handshake).
    pub fn finish_disconnect(&mut self) -> Result<(), X7Error> {
        match self {
            Self::Disconnecting | Self::Connecting => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(X7Error::Protocol(format!(
                "cannot finish disconnect while {self}"
            ))),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    ///
    /// Used when a `Connected` session fails (I/O failure, desynchronized replies).
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}
