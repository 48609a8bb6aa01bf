//! JSON envelopes carried inside frames.
//!
//! # Formats
//!
//! Handshake (opcode 0):
//! ```json
//! { "v": 1, "client_id": "123456789" }
//! ```
//!
//! Outgoing message (opcode 1):
//! ```json
//! { "cmd": "SET_ACTIVITY", "args": { "pid": 4242, "activity": { ... } }, "nonce": "uuid" }
//! ```
//!
//! Incoming message (opcode 1):
//! ```json
//! { "cmd": "DISPATCH", "evt": "READY", "data": { ... }, "nonce": null }
//! ```
//!
//! Error body (opcode 2, or `data` of an `ERROR` event):
//! ```json
//! { "code": 4000, "message": "Invalid Client ID" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::activity::Activity;
use crate::error::Error;
use crate::identifiers::ClientId;

// ============================================================================
// Constants
// ============================================================================

/// Protocol version sent in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Command name of peer-initiated dispatches.
pub const CMD_DISPATCH: &str = "DISPATCH";

/// Command name of presence updates.
pub const CMD_SET_ACTIVITY: &str = "SET_ACTIVITY";

/// Event name signalling the peer accepts updates.
pub const EVT_READY: &str = "READY";

/// Event name carrying an [`RpcError`] body.
pub const EVT_ERROR: &str = "ERROR";

// ============================================================================
// Handshake
// ============================================================================

/// Mandatory first frame of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handshake {
    /// Protocol version.
    pub v: u32,
    /// Application id.
    pub client_id: ClientId,
}

impl Handshake {
    /// Creates a handshake for the current protocol version.
    #[inline]
    #[must_use]
    pub fn new(client_id: ClientId) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            client_id,
        }
    }
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments of an outgoing command. The command name travels with them.
pub trait CommandArgs: Serialize {
    /// Name placed in the envelope's `cmd` field.
    fn command(&self) -> &'static str;
}

/// Arguments of `SET_ACTIVITY`. A `null` activity clears the presence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetActivityArgs<'a> {
    /// Id of the process the presence belongs to.
    pub pid: u32,
    /// Presence to display, or `None` to clear it.
    pub activity: Option<&'a Activity>,
}

impl CommandArgs for SetActivityArgs<'_> {
    fn command(&self) -> &'static str {
        CMD_SET_ACTIVITY
    }
}

// ============================================================================
// OutgoingMessage
// ============================================================================

/// Envelope sent from the client to the peer.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage<T> {
    /// Command name.
    pub cmd: &'static str,
    /// Event name, absent for plain commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evt: Option<String>,
    /// Command arguments.
    pub args: T,
    /// Correlation value echoed back by the peer.
    pub nonce: Value,
}

impl<T: CommandArgs> OutgoingMessage<T> {
    /// Wraps `args` in an envelope with a fresh nonce.
    #[must_use]
    pub fn new(args: T) -> Self {
        Self {
            cmd: args.command(),
            evt: None,
            args,
            nonce: Value::String(Uuid::new_v4().to_string()),
        }
    }
}

// ============================================================================
// IncomingMessage
// ============================================================================

/// Envelope received from the peer. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Command name.
    pub cmd: String,
    /// Event name.
    #[serde(default)]
    pub evt: Option<String>,
    /// Command or event payload.
    #[serde(default)]
    pub data: Value,
    /// Nonce of the request this answers, if any.
    #[serde(default)]
    pub nonce: Value,
}

impl IncomingMessage {
    /// Returns `true` for the `DISPATCH`/`READY` event.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cmd == CMD_DISPATCH && self.evt.as_deref() == Some(EVT_READY)
    }

    /// Returns `true` for an `ERROR` event.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.evt.as_deref() == Some(EVT_ERROR)
    }

    /// Decodes `data` as an error body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `data` is not an error body.
    pub fn error(&self) -> Result<RpcError, Error> {
        Ok(RpcError::deserialize(&self.data)?)
    }
}

// ============================================================================
// RpcError
// ============================================================================

/// Error body sent by the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Human readable message.
    pub message: String,
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        Error::remote(err.code, err.message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_handshake_json() {
        let json = serde_json::to_value(Handshake::new(ClientId::new(1234))).unwrap();
        assert_eq!(json, json!({ "v": 1, "client_id": "1234" }));
    }

    #[test]
    fn test_set_activity_clear() {
        let message = OutgoingMessage::new(SetActivityArgs {
            pid: 42,
            activity: None,
        });
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["cmd"], "SET_ACTIVITY");
        assert_eq!(json["args"], json!({ "pid": 42, "activity": null }));
        assert!(json.get("evt").is_none());
        assert!(json["nonce"].is_string());
    }

    #[test]
    fn test_nonces_differ() {
        let args = SetActivityArgs {
            pid: 1,
            activity: None,
        };
        let a = OutgoingMessage::new(args.clone());
        let b = OutgoingMessage::new(args);
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_incoming_ready() {
        let message: IncomingMessage = serde_json::from_str(
            r#"{"cmd":"DISPATCH","evt":"READY","data":{"v":1,"user":{"id":"1"}},"nonce":null,"extra":true}"#,
        )
        .unwrap();
        assert!(message.is_ready());
        assert!(!message.is_error());
    }

    #[test]
    fn test_incoming_error() {
        let message: IncomingMessage = serde_json::from_str(
            r#"{"cmd":"SET_ACTIVITY","evt":"ERROR","data":{"code":4000,"message":"bad"},"nonce":"n"}"#,
        )
        .unwrap();
        assert!(message.is_error());
        assert!(!message.is_ready());

        let error = message.error().unwrap();
        assert_eq!(error.code, 4000);
        assert_eq!(error.message, "bad");
    }

    #[test]
    fn test_incoming_without_evt() {
        let message: IncomingMessage =
            serde_json::from_str(r#"{"cmd":"SET_ACTIVITY","data":null,"nonce":"n"}"#).unwrap();
        assert!(message.evt.is_none());
        assert!(!message.is_ready());
    }

    #[test]
    fn test_rpc_error_into_error() {
        let err: Error = RpcError {
            code: 1000,
            message: "closed".into(),
        }
        .into();
        assert!(matches!(err, Error::RemoteError { code: 1000, .. }));
    }
}
