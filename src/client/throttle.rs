//! Presence update throttling.
//!
//! Keeps the last requested presence and decides when it may be sent. The
//! peer receives at most one update per [`UPDATE_INTERVAL`]; updates
//! requested inside the window are coalesced into one deferred send of the
//! latest value.
//!
//! This type holds no timers itself. The client asks for a [`Decision`]
//! and schedules the deferred send, keeping its token here so a disconnect
//! can cancel it.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::activity::Activity;

// ============================================================================
// Constants
// ============================================================================

/// Minimum spacing between two presence sends.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(15);

// ============================================================================
// Decision
// ============================================================================

/// What to do with the pending presence right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// Interval elapsed, send immediately.
    SendNow,
    /// Schedule a deferred send after the delay.
    Defer(Duration),
    /// A deferred send is already scheduled.
    Idle,
}

// ============================================================================
// Throttle
// ============================================================================

#[derive(Debug)]
pub(crate) struct Throttle {
    interval: Duration,
    /// Last requested value. The outer `None` means nothing was requested;
    /// `Some(None)` is a request to clear the presence.
    requested: Option<Option<Activity>>,
    last_sent_at: Option<Instant>,
    deferred: Option<CancellationToken>,
}

impl Throttle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            requested: None,
            last_sent_at: None,
            deferred: None,
        }
    }

    /// Records a requested value.
    ///
    /// Returns `false` if it equals the previous request.
    pub(crate) fn request(&mut self, value: Option<Activity>) -> bool {
        if self.requested.as_ref() == Some(&value) {
            return false;
        }
        self.requested = Some(value);
        true
    }

    /// Returns the value to send, if one was ever requested.
    pub(crate) fn pending(&self) -> Option<Option<&Activity>> {
        self.requested.as_ref().map(Option::as_ref)
    }

    pub(crate) fn decide(&self, now: Instant) -> Decision {
        let Some(sent_at) = self.last_sent_at else {
            return Decision::SendNow;
        };

        let elapsed = now.saturating_duration_since(sent_at);
        if elapsed >= self.interval {
            Decision::SendNow
        } else if self.deferred.is_some() {
            Decision::Idle
        } else {
            Decision::Defer(self.interval - elapsed)
        }
    }

    pub(crate) fn mark_sent(&mut self, now: Instant) {
        self.last_sent_at = Some(now);
    }

    pub(crate) fn set_deferred(&mut self, token: CancellationToken) {
        if let Some(previous) = self.deferred.replace(token) {
            previous.cancel();
        }
    }

    /// Forgets the deferred send without cancelling it. Called by the send
    /// itself when it fires.
    pub(crate) fn clear_deferred(&mut self) {
        self.deferred = None;
    }

    pub(crate) fn cancel_deferred(&mut self) {
        if let Some(token) = self.deferred.take() {
            token.cancel();
        }
    }

    #[cfg(test)]
    pub(crate) fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(details: &str) -> Activity {
        Activity {
            details: Some(details.to_string()),
            ..Default::default()
        }
    }

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_first_request_sends_now() {
        let mut throttle = Throttle::new(UPDATE_INTERVAL);
        assert!(throttle.pending().is_none());

        assert!(throttle.request(Some(activity("A"))));
        assert_eq!(throttle.decide(Instant::now()), Decision::SendNow);
    }

    #[test]
    fn test_identical_request_is_noop() {
        let mut throttle = Throttle::new(UPDATE_INTERVAL);
        assert!(throttle.request(Some(activity("A"))));
        assert!(!throttle.request(Some(activity("A"))));

        assert!(throttle.request(None));
        assert!(!throttle.request(None));
        assert_eq!(throttle.pending(), Some(None));
    }

    #[test]
    fn test_updates_inside_window_coalesce() {
        let base = Instant::now();
        let mut throttle = Throttle::new(UPDATE_INTERVAL);

        // t=0: A goes out immediately.
        throttle.request(Some(activity("A")));
        assert_eq!(throttle.decide(base), Decision::SendNow);
        throttle.mark_sent(base);

        // t=3000: B is deferred until t=15000.
        throttle.request(Some(activity("B")));
        assert_eq!(
            throttle.decide(at(base, 3_000)),
            Decision::Defer(Duration::from_millis(12_000))
        );
        throttle.set_deferred(CancellationToken::new());

        // t=6000: C rides on the same deferred send.
        throttle.request(Some(activity("C")));
        assert_eq!(throttle.decide(at(base, 6_000)), Decision::Idle);

        // t=15000: the deferred send transmits C only.
        throttle.clear_deferred();
        assert_eq!(throttle.pending(), Some(Some(&activity("C"))));
        throttle.mark_sent(at(base, 15_000));

        // Re-requesting the transmitted value does nothing.
        assert!(!throttle.request(Some(activity("C"))));
    }

    #[test]
    fn test_revert_inside_window_is_sent_again() {
        let base = Instant::now();
        let mut throttle = Throttle::new(UPDATE_INTERVAL);
        throttle.request(Some(activity("A")));
        throttle.mark_sent(base);

        // Duplicates are checked against the last request, not the last send.
        assert!(throttle.request(Some(activity("B"))));
        assert!(throttle.request(Some(activity("A"))));
        assert_eq!(
            throttle.decide(at(base, 6_000)),
            Decision::Defer(Duration::from_millis(9_000))
        );
        assert_eq!(throttle.pending(), Some(Some(&activity("A"))));
    }

    #[test]
    fn test_send_now_after_interval() {
        let base = Instant::now();
        let mut throttle = Throttle::new(UPDATE_INTERVAL);
        throttle.request(Some(activity("A")));
        throttle.mark_sent(base);

        throttle.request(Some(activity("B")));
        assert_eq!(throttle.decide(at(base, 15_000)), Decision::SendNow);
        assert_eq!(throttle.decide(at(base, 40_000)), Decision::SendNow);
    }

    #[test]
    fn test_cancel_deferred_cancels_token() {
        let mut throttle = Throttle::new(UPDATE_INTERVAL);
        let token = CancellationToken::new();
        throttle.set_deferred(token.clone());
        assert!(throttle.has_deferred());

        throttle.cancel_deferred();
        assert!(token.is_cancelled());
        assert!(!throttle.has_deferred());
    }

    #[test]
    fn test_replacing_deferred_cancels_previous() {
        let mut throttle = Throttle::new(UPDATE_INTERVAL);
        let first = CancellationToken::new();
        throttle.set_deferred(first.clone());
        throttle.set_deferred(CancellationToken::new());
        assert!(first.is_cancelled());
    }
}
