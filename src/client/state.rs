//! Connection state and connect outcomes.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Error;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Client`](super::Client).
///
/// ```text
/// Disconnected ──connect──► Connecting ──opened──► Connected ──READY──► Ready
///      ▲                        │                      │                  │
///      └────────────────────────┴──── failure / close / disconnect ──────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No session and no attempt in flight.
    #[default]
    Disconnected,
    /// Discovery is running.
    Connecting,
    /// Session started, waiting for `READY`.
    Connected,
    /// Peer accepts presence updates.
    Ready,
}

impl ConnectionState {
    /// Returns `true` while a session exists.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Ready)
    }

    /// Returns `true` once the peer sent `READY`.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ConnectResult
// ============================================================================

/// Outcome of a connect attempt.
///
/// Cloneable so every caller joined on the same attempt observes the same
/// value.
#[derive(Debug, Clone)]
pub enum ConnectResult {
    /// A new session was started.
    Success,
    /// A session already existed; nothing was done.
    AlreadyConnected,
    /// The attempt was cancelled by a disconnect or by closing the client.
    Cancelled,
    /// Discovery failed.
    Failed(Arc<Error>),
}

impl ConnectResult {
    /// Returns `true` for [`ConnectResult::Success`].
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns `true` if a session exists after the attempt.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Success | Self::AlreadyConnected)
    }

    /// Returns the failure cause, if any.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
