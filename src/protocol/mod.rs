//! IPC wire protocol.
//!
//! Every unit on the wire is a binary [`Frame`] whose payload, for the
//! handshake, message and close opcodes, is UTF-8 JSON.
//!
//! # Protocol Overview
//!
//! | Opcode | Name | Direction | Payload |
//! |--------|------|-----------|---------|
//! | 0 | `Handshake` | Local → Peer | [`Handshake`] |
//! | 1 | `Message` | Both | [`OutgoingMessage`] / [`IncomingMessage`] |
//! | 2 | `Close` | Peer → Local | [`RpcError`] |
//! | 3 | `Ping` | Peer → Local | opaque, echoed |
//! | 4 | `Pong` | Both | opaque |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Async frame reader/writer |
//! | `frame` | Frame and opcode types |
//! | `message` | JSON envelopes |

// ============================================================================
// Submodules
// ============================================================================

/// Async frame reader/writer.
pub mod codec;

/// Frame and opcode types.
pub mod frame;

/// JSON envelope types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{read_frame, write_frame};
pub use frame::{Frame, HEADER_LEN, MAX_PAYLOAD_LEN, Opcode};
pub use message::{
    CommandArgs, Handshake, IncomingMessage, OutgoingMessage, RpcError, SetActivityArgs,
};
