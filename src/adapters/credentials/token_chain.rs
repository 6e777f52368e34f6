//! Ordered chain of token strategies.
//!
//! The chain tries each strategy in order and returns the first credential
//! produced. A failing strategy is logged and skipped; only when every
//! strategy has failed does the chain fail, listing each attempt.
//!
//! # Example
//!
//! ```ignore
//! let chain = TokenSourceChain::new()
//!     .with_strategy(Arc::new(oauth))
//!     .with_strategy(Arc::new(StaticTokenStrategy::from_env("env", "CALENDAR_TOKEN")));
//!
//! let credential = chain.acquire(&ctx).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{Credential, CredentialError, CredentialProvider, RequestContext, TokenStrategy};

#[derive(Default, Clone)]
pub struct TokenSourceChain {
    strategies: Vec<Arc<dyn TokenStrategy>>,
}

impl TokenSourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy; earlier strategies take precedence.
    pub fn with_strategy(mut self, strategy: Arc<dyn TokenStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for TokenSourceChain {
    async fn acquire(&self, ctx: &RequestContext) -> Result<Credential, CredentialError> {
        if self.strategies.is_empty() {
            return Err(CredentialError::Unavailable {
                attempts: vec!["no credential strategies configured".to_string()],
            });
        }

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            if ctx.is_cancelled() {
                return Err(CredentialError::Cancelled);
            }
            match strategy.acquire(ctx).await {
                Ok(credential) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        request_id = ctx.request_id(),
                        "Credential acquired"
                    );
                    return Ok(credential);
                }
                Err(CredentialError::Cancelled) => return Err(CredentialError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        request_id = ctx.request_id(),
                        error = %e,
                        "Credential strategy failed, trying next"
                    );
                    attempts.push(e.to_string());
                }
            }
        }

        tracing::error!(
            request_id = ctx.request_id(),
            attempts = attempts.len(),
            "All credential strategies failed"
        );
        Err(CredentialError::Unavailable { attempts })
    }

    async fn invalidate(&self, rejected: &Credential) {
        for strategy in &self.strategies {
            if strategy.name() == rejected.source() {
                strategy.invalidate(rejected).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: &'static str,
        result: Result<&'static str, CredentialError>,
        calls: AtomicUsize,
        invalidations: AtomicUsize,
    }

    impl Scripted {
        fn ok(name: &'static str, token: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Ok(token),
                calls: AtomicUsize::new(0),
                invalidations: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str, err: CredentialError) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Err(err),
                calls: AtomicUsize::new(0),
                invalidations: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TokenStrategy for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn acquire(&self, _ctx: &RequestContext) -> Result<Credential, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map(|token| Credential::new(token, None, self.name))
        }

        async fn invalidate(&self, _rejected: &Credential) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn first_success_wins_and_later_strategies_are_not_called() {
        let first = Scripted::ok("oauth", "tok-1");
        let second = Scripted::ok("env", "tok-2");
        let chain = TokenSourceChain::new()
            .with_strategy(first.clone())
            .with_strategy(second.clone());

        let cred = chain.acquire(&RequestContext::new()).await.unwrap();

        assert_eq!(cred.access_token(), "tok-1");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_through_failures_in_order() {
        let first = Scripted::failing("oauth", CredentialError::rejected("oauth", "invalid_grant"));
        let second = Scripted::ok("env", "tok-2");
        let chain = TokenSourceChain::new()
            .with_strategy(first.clone())
            .with_strategy(second);

        let cred = chain.acquire(&RequestContext::new()).await.unwrap();

        assert_eq!(cred.access_token(), "tok-2");
        assert_eq!(cred.source(), "env");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failing_reports_every_attempt() {
        let chain = TokenSourceChain::new()
            .with_strategy(Scripted::failing(
                "oauth",
                CredentialError::failed("oauth", "connection refused"),
            ))
            .with_strategy(Scripted::failing(
                "env",
                CredentialError::not_configured("env", "CALENDAR_TOKEN unset"),
            ));

        let err = chain.acquire(&RequestContext::new()).await.unwrap_err();

        match err {
            CredentialError::Unavailable { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].contains("connection refused"));
                assert!(attempts[1].contains("CALENDAR_TOKEN unset"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_chain_is_unavailable() {
        let err = TokenSourceChain::new()
            .acquire(&RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn cancelled_context_stops_the_chain() {
        let first = Scripted::ok("oauth", "tok");
        let chain = TokenSourceChain::new().with_strategy(first.clone());
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = chain.acquire(&ctx).await.unwrap_err();

        assert_eq!(err, CredentialError::Cancelled);
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalidate_targets_the_issuing_strategy() {
        let oauth = Scripted::ok("oauth", "tok-1");
        let env = Scripted::ok("env", "tok-2");
        let chain = TokenSourceChain::new()
            .with_strategy(oauth.clone())
            .with_strategy(env.clone());

        chain.invalidate(&Credential::new("tok-1", None, "oauth")).await;

        assert_eq!(oauth.invalidations.load(Ordering::SeqCst), 1);
        assert_eq!(env.invalidations.load(Ordering::SeqCst), 0);
    }
}
