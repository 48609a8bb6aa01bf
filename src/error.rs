//! Error types for the Rich Presence IPC client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use rich_presence_ipc::{Activity, Result};
//!
//! fn build() -> Result<Activity> {
//!     Activity::builder().details("Editing main.rs").build()
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Discovery | [`Error::PeerNotFound`] |
//! | Session | [`Error::ChannelClosed`], [`Error::ProtocolViolation`], [`Error::RemoteError`] |
//! | Lifecycle | [`Error::Cancelled`] |
//! | Caller | [`Error::Config`], [`Error::InvalidActivity`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// No IPC endpoint of a running peer could be opened.
    ///
    /// This is the normal outcome when the peer application is not running.
    #[error("Could not find a running Discord instance")]
    PeerNotFound,

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The IPC channel was closed (short read or short write).
    #[error("Channel closed")]
    ChannelClosed,

    /// The peer sent something the protocol does not allow.
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the violation.
        message: String,
    },

    /// The peer reported an application-level error.
    #[error("Remote error {code}: {message}")]
    RemoteError {
        /// Error code sent by the peer.
        code: i32,
        /// Error message sent by the peer.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// An in-flight operation was cancelled by an explicit user action.
    #[error("Operation cancelled")]
    Cancelled,

    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An activity field violates its length or count constraint.
    #[error("Invalid activity: {message}")]
    InvalidActivity {
        /// Description of the violated constraint.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a protocol violation error.
    #[inline]
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(code: i32, message: impl Into<String>) -> Self {
        Self::RemoteError {
            code,
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid activity error.
    #[inline]
    pub fn invalid_activity(message: impl Into<String>) -> Self {
        Self::InvalidActivity {
            message: message.into(),
        }
    }

    /// Converts a transport IO error, folding short reads and writes into
    /// [`Error::ChannelClosed`].
    pub fn from_transport(err: IoError) -> Self {
        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::WriteZero
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => Self::ChannelClosed,
            _ => Self::Io(err),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the peer simply isn't running.
    #[inline]
    #[must_use]
    pub fn is_peer_not_found(&self) -> bool {
        matches!(self, Self::PeerNotFound)
    }

    /// Returns `true` if this error ends a session like an ordinary
    /// disconnection.
    #[inline]
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ChannelClosed | Self::Cancelled)
    }

    /// Returns `true` if this is a transport or protocol level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::PeerNotFound
                | Self::ChannelClosed
                | Self::ProtocolViolation { .. }
                | Self::Io(_)
        )
    }

    /// Returns `true` if the error was caused by the caller rather than the
    /// peer or the transport.
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidActivity { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::remote(4000, "Invalid Client ID");
        assert_eq!(err.to_string(), "Remote error 4000: Invalid Client ID");
    }

    #[test]
    fn test_protocol_violation_display() {
        let err = Error::protocol_violation("unexpected opcode 9");
        assert_eq!(err.to_string(), "Protocol violation: unexpected opcode 9");
    }

    #[test]
    fn test_from_transport_short_read() {
        let err = Error::from_transport(IoError::new(ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(err, Error::ChannelClosed));

        let err = Error::from_transport(IoError::new(ErrorKind::WriteZero, "zero"));
        assert!(matches!(err, Error::ChannelClosed));
    }

    #[test]
    fn test_from_transport_other_io() {
        let err = Error::from_transport(IoError::new(ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::PeerNotFound.is_connection_error());
        assert!(Error::ChannelClosed.is_connection_error());
        assert!(Error::protocol_violation("x").is_connection_error());
        assert!(!Error::config("x").is_connection_error());
        assert!(!Error::remote(1, "x").is_connection_error());
    }

    #[test]
    fn test_is_caller_error() {
        assert!(Error::config("x").is_caller_error());
        assert!(Error::invalid_activity("x").is_caller_error());
        assert!(!Error::Cancelled.is_caller_error());
    }

    #[test]
    fn test_is_disconnect() {
        assert!(Error::ChannelClosed.is_disconnect());
        assert!(Error::Cancelled.is_disconnect());
        assert!(!Error::PeerNotFound.is_disconnect());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
