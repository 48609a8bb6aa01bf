//! Awaitable handle to a connect attempt.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture, Shared};
use tokio::runtime::Handle;

use super::state::ConnectResult;

// ============================================================================
// ConnectHandle
// ============================================================================

/// Resolves to the [`ConnectResult`] of one connect attempt.
///
/// The attempt runs on its own task whether or not the handle is awaited.
/// Callers that join an in-flight attempt receive clones of the same
/// handle; [`ConnectHandle::ptr_eq`] tells them apart.
#[derive(Clone)]
#[must_use = "the attempt runs regardless, but its result is only observable by awaiting"]
pub struct ConnectHandle {
    inner: Shared<BoxFuture<'static, ConnectResult>>,
}

impl ConnectHandle {
    /// Runs `attempt` on `runtime` and shares its result.
    pub(crate) fn spawn<F>(runtime: &Handle, attempt: F) -> Self
    where
        F: Future<Output = ConnectResult> + Send + 'static,
    {
        let join = runtime.spawn(attempt);
        // A task that never completes normally was torn down with the runtime.
        let result = async move { join.await.unwrap_or(ConnectResult::Cancelled) };
        Self {
            inner: result.boxed().shared(),
        }
    }

    /// Creates an already resolved handle.
    pub(crate) fn ready(result: ConnectResult) -> Self {
        Self {
            inner: future::ready(result).boxed().shared(),
        }
    }

    /// Returns `true` if both handles refer to the same attempt.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// Returns the result if the attempt already finished and was polled.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<&ConnectResult> {
        self.inner.peek()
    }
}

impl Future for ConnectHandle {
    type Output = ConnectResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl fmt::Debug for ConnectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectHandle")
            .field("result", &self.peek())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_result() {
        let handle = ConnectHandle::spawn(&Handle::current(), async { ConnectResult::Success });
        let joined = handle.clone();

        assert!(handle.ptr_eq(&joined));
        assert!(handle.await.is_success());
        assert!(joined.await.is_success());
    }

    #[tokio::test]
    async fn test_distinct_attempts_differ() {
        let a = ConnectHandle::ready(ConnectResult::AlreadyConnected);
        let b = ConnectHandle::ready(ConnectResult::AlreadyConnected);
        assert!(!a.ptr_eq(&b));
    }

    #[tokio::test]
    async fn test_peek_after_completion() {
        let handle = ConnectHandle::ready(ConnectResult::Cancelled);
        assert!(handle.peek().is_none());

        let observer = handle.clone();
        let _ = handle.await;
        assert!(matches!(observer.peek(), Some(ConnectResult::Cancelled)));
    }
}
