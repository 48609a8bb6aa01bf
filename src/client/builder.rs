//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use rich_presence_ipc::Client;
//!
//! # async fn example() -> rich_presence_ipc::Result<()> {
//! let client = Client::builder(1_234_567_890_u64)
//!     .reconnect_delay(Duration::from_secs(30))
//!     .add_candidate_dir("/run/user/1000/custom")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::transport::default_candidate_dirs;

use super::core::{Client, ClientConfig};
use super::reconnect::DEFAULT_RECONNECT_DELAY;
use super::throttle::UPDATE_INTERVAL;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Application id sent in the handshake.
    client_id: ClientId,
    /// Reconnect automatically after failures and closes.
    auto_reconnect: bool,
    /// Delay before an automatic reconnect.
    reconnect_delay: Duration,
    /// Socket directories replacing the environment defaults.
    candidate_dirs: Option<Vec<PathBuf>>,
    /// Socket directories probed after the others.
    extra_dirs: Vec<PathBuf>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new(client_id: impl Into<ClientId>) -> Self {
        Self {
            client_id: client_id.into(),
            auto_reconnect: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            candidate_dirs: None,
            extra_dirs: Vec::new(),
        }
    }

    /// Enables or disables automatic reconnection. Enabled by default.
    #[inline]
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the delay before an automatic reconnect. Defaults to 15 seconds.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Replaces the socket directories derived from the environment.
    ///
    /// Ignored on Windows, where pipe names are fixed.
    #[must_use]
    pub fn candidate_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.candidate_dirs = Some(dirs.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a socket directory probed after the others.
    #[inline]
    #[must_use]
    pub fn add_candidate_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_dirs.push(dir.into());
        self
    }

    /// Builds the client.
    ///
    /// Must be called from within a Tokio runtime; the client spawns its
    /// tasks on it.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the reconnect delay is zero
    /// - [`Error::Config`] if no Tokio runtime is running
    pub fn build(self) -> Result<Client> {
        self.validate_delay()?;
        let runtime = Self::current_runtime()?;

        let mut candidates = self.candidate_dirs.unwrap_or_else(default_candidate_dirs);
        candidates.extend(self.extra_dirs);

        let config = ClientConfig {
            client_id: self.client_id,
            candidates,
            auto_reconnect: self.auto_reconnect,
            reconnect_delay: self.reconnect_delay,
            update_interval: UPDATE_INTERVAL,
        };

        Ok(Client::new(config, runtime))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate_delay(&self) -> Result<()> {
        if self.reconnect_delay.is_zero() {
            return Err(Error::config(
                "Reconnect delay must be greater than zero.\n\
                 Use .auto_reconnect(false) to disable reconnection instead.",
            ));
        }
        Ok(())
    }

    fn current_runtime() -> Result<Handle> {
        Handle::try_current().map_err(|_| {
            Error::config(
                "No Tokio runtime is running. Build the client from within a runtime,\n\
                 e.g. inside #[tokio::main].",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_defaults() {
        let builder = ClientBuilder::new(7_u64);
        assert_eq!(builder.client_id, ClientId::new(7));
        assert!(builder.auto_reconnect);
        assert_eq!(builder.reconnect_delay, Duration::from_secs(15));
        assert!(builder.candidate_dirs.is_none());
        assert!(builder.extra_dirs.is_empty());
    }

    #[test]
    fn test_setters() {
        let builder = ClientBuilder::new(1_u64)
            .auto_reconnect(false)
            .reconnect_delay(Duration::from_secs(3))
            .candidate_dirs(["/a", "/b"])
            .add_candidate_dir("/c");

        assert!(!builder.auto_reconnect);
        assert_eq!(builder.reconnect_delay, Duration::from_secs(3));
        assert_eq!(
            builder.candidate_dirs,
            Some(vec![PathBuf::from("/a"), PathBuf::from("/b")])
        );
        assert_eq!(builder.extra_dirs, vec![PathBuf::from("/c")]);
    }

    #[test]
    fn test_build_fails_outside_runtime() {
        let err = ClientBuilder::new(1_u64).build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("runtime"));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_delay() {
        let err = ClientBuilder::new(1_u64)
            .reconnect_delay(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.is_caller_error());
    }

    #[tokio::test]
    async fn test_build_appends_extra_dirs() {
        let client = ClientBuilder::new(1_u64)
            .candidate_dirs(["/a"])
            .add_candidate_dir("/b")
            .build()
            .unwrap();

        assert_eq!(
            client.inner.config.candidates,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[tokio::test]
    async fn test_build_uses_environment_defaults() {
        let client = ClientBuilder::new(1_u64).build().unwrap();
        assert_eq!(client.inner.config.candidates, default_candidate_dirs());
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ClientBuilder::new(1_u64).auto_reconnect(false);
        let cloned = builder.clone();
        assert_eq!(builder.auto_reconnect, cloned.auto_reconnect);
    }
}
