//! Rich Presence IPC - Async client for the Discord local IPC protocol.
//!
//! This library keeps a persistent session with the locally running
//! Discord application and pushes rich presence updates over it.
//!
//! # Architecture
//!
//! The client talks to the peer over a local byte channel:
//!
//! - **Unix**: `discord-ipc-{0..9}` socket in the runtime/temp directories
//! - **Windows**: `\\.\pipe\discord-ipc-{0..9}` named pipe
//!
//! Key design principles:
//!
//! - One lock per [`Client`] serializes every state change
//! - At most one live session per client; late events from superseded
//!   sessions are ignored
//! - Sessions run a read loop and a write loop on separate tasks
//! - Failures never escape a session; they close it and trigger a
//!   reconnect
//!
//! # Quick Start
//!
//! ```no_run
//! use rich_presence_ipc::{Activity, Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder(1_234_567_890_u64).build()?;
//!
//!     // Not fatal if Discord isn't running; the client retries.
//!     let result = client.connect().await;
//!     println!("connect: {result:?}");
//!
//!     let activity = Activity::builder()
//!         .details("Editing main.rs")
//!         .state("Workspace: rich-presence-ipc")
//!         .large_image("rust-logo")
//!         .build()?;
//!     client.update(Some(activity));
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`activity`] | Presence payload and its validating builder |
//! | [`client`] | [`Client`], state machine, reconnect and throttling |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Frames, codec and JSON envelopes |
//! | [`transport`] | Endpoint discovery and socket sessions |

// ============================================================================
// Modules
// ============================================================================

/// Presence payload.
///
/// Use [`Activity::builder()`] to create a validated value.
pub mod activity;

/// Presence client.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// IPC wire protocol.
///
/// Binary frames and the JSON envelopes they carry.
pub mod protocol;

/// IPC transport layer.
///
/// Endpoint discovery and the framed session running over it.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Activity types
pub use activity::{
    Activity, ActivityAssets, ActivityBuilder, ActivityButton, ActivityParty, ActivitySecrets,
    ActivityTimestamps, ActivityType, StatusDisplayType,
};

// Client types
pub use client::{Client, ClientBuilder, ConnectHandle, ConnectResult, ConnectionState};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ClientId, SessionId};
