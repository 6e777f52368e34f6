//! Mock Calendar Gateway for testing.
//!
//! Provides a configurable in-process implementation of the
//! `CalendarGateway` port, so booking flows can be exercised without a
//! real calendar.
//!
//! # Features
//!
//! - Pre-configured busy windows
//! - Queued create results (consumed in order, then defaults to success)
//! - Simulated create latency, cancellable through the request context
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockCalendarGateway::new()
//!     .with_busy(window)
//!     .with_create_error(GatewayError::Unavailable("503".into()));
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::TimeWindow;
use crate::ports::{CalendarGateway, CreatedEvent, EventInput, GatewayError, RequestContext};

#[derive(Debug, Clone, Default)]
pub struct MockCalendarGateway {
    busy: Arc<Mutex<Vec<TimeWindow>>>,
    busy_error: Arc<Mutex<Option<GatewayError>>>,
    create_results: Arc<Mutex<VecDeque<Result<CreatedEvent, GatewayError>>>>,
    create_delay: Duration,
    delete_error: Arc<Mutex<Option<GatewayError>>>,
    created: Arc<Mutex<Vec<(String, EventInput)>>>,
    deleted: Arc<Mutex<Vec<(String, String)>>>,
    busy_calls: Arc<AtomicUsize>,
    next_event: Arc<AtomicUsize>,
}

impl MockCalendarGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy(self, window: TimeWindow) -> Self {
        self.add_busy(window);
        self
    }

    /// Every busy-window query fails with `err`.
    pub fn with_busy_error(self, err: GatewayError) -> Self {
        self.set_busy_error(Some(err));
        self
    }

    pub fn with_create_result(self, result: Result<CreatedEvent, GatewayError>) -> Self {
        lock(&self.create_results).push_back(result);
        self
    }

    pub fn with_create_error(self, err: GatewayError) -> Self {
        self.with_create_result(Err(err))
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn with_delete_error(self, err: GatewayError) -> Self {
        *lock(&self.delete_error) = Some(err);
        self
    }

    /// Adds a busy window after construction; clones share state.
    pub fn add_busy(&self, window: TimeWindow) {
        lock(&self.busy).push(window);
    }

    pub fn set_busy_error(&self, err: Option<GatewayError>) {
        *lock(&self.busy_error) = err;
    }

    pub fn created_events(&self) -> Vec<(String, EventInput)> {
        lock(&self.created).clone()
    }

    pub fn deleted_events(&self) -> Vec<(String, String)> {
        lock(&self.deleted).clone()
    }

    pub fn busy_calls(&self) -> usize {
        self.busy_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CalendarGateway for MockCalendarGateway {
    async fn list_busy_windows(
        &self,
        ctx: &RequestContext,
        _calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeWindow>, GatewayError> {
        self.busy_calls.fetch_add(1, Ordering::SeqCst);
        if ctx.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let range = TimeWindow::new(from, to).map_err(|e| GatewayError::InvalidInput(e.to_string()))?;
        if let Some(err) = lock(&self.busy_error).clone() {
            return Err(err);
        }
        let mut windows: Vec<TimeWindow> = lock(&self.busy)
            .iter()
            .filter(|w| w.overlaps(&range))
            .copied()
            .collect();
        windows.sort();
        Ok(windows)
    }

    async fn create_event(
        &self,
        ctx: &RequestContext,
        calendar_id: &str,
        input: &EventInput,
    ) -> Result<CreatedEvent, GatewayError> {
        if !self.create_delay.is_zero() {
            tokio::select! {
                _ = ctx.cancelled() => return Err(GatewayError::Cancelled),
                _ = tokio::time::sleep(self.create_delay) => {}
            }
        }
        if ctx.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let queued = lock(&self.create_results).pop_front();
        let result = queued.unwrap_or_else(|| {
            let n = self.next_event.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(CreatedEvent {
                event_id: format!("evt-{}", n),
                html_link: Some(format!("https://calendar.example.com/evt-{}", n)),
                conference_link: input
                    .request_conference
                    .then(|| format!("https://meet.example.com/evt-{}", n)),
            })
        });
        if result.is_ok() {
            lock(&self.created).push((calendar_id.to_string(), input.clone()));
        }
        result
    }

    async fn delete_event(
        &self,
        _ctx: &RequestContext,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), GatewayError> {
        if let Some(err) = lock(&self.delete_error).clone() {
            return Err(err);
        }
        lock(&self.deleted).push((calendar_id.to_string(), event_id.to_string()));
        Ok(())
    }
}
