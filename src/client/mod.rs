//! Presence client.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Connection state machine and presence updates |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ConnectHandle`] | Awaitable result of a connect attempt |
//! | [`ConnectionState`] | `Disconnected → Connecting → Connected → Ready` |
//! | [`ConnectResult`] | Outcome of a connect attempt |
//!
//! # Example
//!
//! ```no_run
//! use rich_presence_ipc::{Activity, Client, ConnectionState};
//!
//! # async fn example() -> rich_presence_ipc::Result<()> {
//! let client = Client::builder(1_234_567_890_u64).build()?;
//! let _ = client.connect().await;
//!
//! let mut states = client.subscribe();
//! let _ = states.wait_for(|s| *s == ConnectionState::Ready).await;
//!
//! client.update(Some(Activity::builder().state("In a match").build()?));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Client and connection state machine.
pub mod core;

/// Awaitable connect handle.
pub mod handle;

/// Automatic reconnection.
pub mod reconnect;

/// Connection state and connect outcomes.
pub mod state;

/// Presence update throttling.
pub mod throttle;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::Client;
pub use handle::ConnectHandle;
pub use reconnect::DEFAULT_RECONNECT_DELAY;
pub use state::{ConnectResult, ConnectionState};
pub use throttle::UPDATE_INTERVAL;
