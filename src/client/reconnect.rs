//! Automatic reconnection.
//!
//! At most one reconnect job exists per client. Scheduling a job cancels
//! the previous one; a user connect or disconnect cancels it too. The job
//! sleeps for the configured delay and then runs one non-user connect
//! attempt, whose failure schedules the next job.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use super::core::{ClientInner, ClientState};

// ============================================================================
// Defaults
// ============================================================================

/// Delay before an automatic reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(15);

// ============================================================================
// ClientInner - Reconnect
// ============================================================================

impl ClientInner {
    /// Replaces the pending reconnect job with a new one, if enabled.
    pub(crate) fn schedule_reconnect(self: &Arc<Self>, st: &mut ClientState) {
        self.cancel_reconnect(st);
        if !self.config.auto_reconnect || self.root.is_cancelled() {
            return;
        }

        let token = self.root.child_token();
        st.reconnect = Some(token.clone());

        let delay = self.config.reconnect_delay;
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        let client = Arc::downgrade(self);
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let Some(inner) = client.upgrade() else {
                return;
            };
            let mut st = inner.state.lock();
            // Cancelled while waiting for the lock.
            if token.is_cancelled() {
                return;
            }
            st.reconnect = None;

            debug!("Reconnecting");
            let _ = inner.connect_locked(&mut st, false);
        });
    }

    /// Cancels the pending reconnect job, if any.
    pub(crate) fn cancel_reconnect(&self, st: &mut ClientState) {
        if let Some(token) = st.reconnect.take() {
            trace!("Cancelled pending reconnect");
            token.cancel();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
