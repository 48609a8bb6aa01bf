//! IPC transport layer.
//!
//! Finds the peer's local endpoint and runs a framed session over it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │      Unix socket / pipe      │  Peer           │
//! │                 │◄────────────────────────────►│  (desktop app)  │
//! │  Session        │     discord-ipc-{0..9}       │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `discovery::open` - Probe endpoints and open the first one found
//! 2. `Session::spawn` - Start the read and write loops
//! 3. Handshake is written, peer answers with `READY`
//! 4. `Session::send` - Queue commands
//! 5. `Session::close` - Stop both loops, emit `Closed`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `discovery` | Endpoint resolution and opening |
//! | `session` | Framed session and its I/O loops |

// ============================================================================
// Submodules
// ============================================================================

/// Endpoint resolution and opening.
pub mod discovery;

/// Framed session over an opened transport.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use discovery::{IpcStream, Transport, default_candidate_dirs, open};
pub use session::{Session, SessionEvent};
