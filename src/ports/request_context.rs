//! Per-request cancellation and deadline propagation.
//!
//! Every port method that suspends takes a `RequestContext`. Adapters wrap
//! their network or store call in [`RequestContext::run`], which bounds the
//! call by the earlier of the request deadline and the adapter's own
//! per-call timeout, and returns as soon as the caller cancels.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a bounded call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("cancelled by caller")]
    Cancelled,

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Cancellation token, optional deadline and a correlation id.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    request_id: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Context with no deadline; per-call timeouts still apply.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// A context cancelled whenever this one is, but which can also be
    /// cancelled on its own without affecting the parent.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            request_id: self.request_id.clone(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Runs `fut` bounded by cancellation, the request deadline and `per_call`.
    pub async fn run<F, T>(&self, per_call: Duration, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        let call_limit = Instant::now() + per_call;
        let limit = match self.deadline {
            Some(deadline) if deadline < call_limit => deadline,
            _ => call_limit,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            result = tokio::time::timeout_at(limit, fut) => {
                result.map_err(|_| Interrupted::TimedOut(per_call))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_future_is_fast() {
        let ctx = RequestContext::new();
        let value = ctx.run(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_applies() {
        let ctx = RequestContext::new();
        let result = ctx
            .run(Duration::from_millis(50), tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(Interrupted::TimedOut(Duration::from_millis(50))));
    }

    #[tokio::test(start_paused = true)]
    async fn request_deadline_wins_when_earlier() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(10));
        let started = Instant::now();
        let result = ctx
            .run(Duration::from_secs(30), tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(matches!(result, Err(Interrupted::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_call() {
        let ctx = RequestContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = ctx
            .run(Duration::from_secs(30), tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert_eq!(result, Err(Interrupted::Cancelled));
    }

    #[tokio::test]
    async fn child_follows_parent_but_not_vice_versa() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }
}
