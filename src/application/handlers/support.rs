//! Pieces shared by the availability and booking handlers.

use std::future::Future;
use std::time::Duration;

use futures::future::join;

use crate::domain::booking::BookingError;
use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, TimeWindow};
use crate::domain::scheduling::merge_windows;
use crate::ports::{
    CalendarGateway, CredentialError, GatewayError, Interrupted, RequestContext,
    ReservationRepository,
};

/// Runs a repository call bounded by the context and `timeout`.
pub(crate) async fn bounded_store<T, F>(
    ctx: &RequestContext,
    timeout: Duration,
    operation: &str,
    fut: F,
) -> Result<T, BookingError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match ctx.run(timeout, fut).await {
        Ok(result) => result.map_err(BookingError::Storage),
        Err(Interrupted::Cancelled) => Err(BookingError::Cancelled(operation.to_string())),
        Err(Interrupted::TimedOut(after)) => Err(BookingError::Storage(DomainError::new(
            ErrorCode::Timeout,
            format!("{} timed out after {:?}", operation, after),
        ))),
    }
}

/// Maps a gateway failure while computing availability.
pub(crate) fn availability_error(err: GatewayError) -> BookingError {
    match err {
        GatewayError::Credential(e) => credential_error(e),
        GatewayError::Cancelled => BookingError::Cancelled("busy window lookup".to_string()),
        GatewayError::InvalidInput(message) => BookingError::invalid_input("range", message),
        other => BookingError::AvailabilityUnavailable(other.to_string()),
    }
}

/// Maps a gateway failure while re-validating a slot at reserve time.
pub(crate) fn gateway_error(err: GatewayError) -> BookingError {
    match err {
        GatewayError::Credential(e) => credential_error(e),
        GatewayError::Cancelled => BookingError::Cancelled("busy window lookup".to_string()),
        GatewayError::InvalidInput(message) => BookingError::invalid_input("slot", message),
        other => BookingError::GatewayUnavailable(other.to_string()),
    }
}

fn credential_error(err: CredentialError) -> BookingError {
    match err {
        CredentialError::Cancelled => BookingError::Cancelled("credential acquisition".to_string()),
        other => BookingError::CredentialUnavailable(other.to_string()),
    }
}

/// Everything that blocks `owner_id` during `range`: calendar busy windows
/// plus local pending/confirmed reservations, merged and sorted.
///
/// Both sources are queried concurrently. A gateway failure is mapped with
/// `on_gateway_error`; it is never replaced by local data alone.
pub(crate) async fn gather_exclusions(
    ctx: &RequestContext,
    gateway: &dyn CalendarGateway,
    reservations: &dyn ReservationRepository,
    calendar_id: &str,
    store_timeout: Duration,
    owner_id: &OwnerId,
    range: &TimeWindow,
    on_gateway_error: fn(GatewayError) -> BookingError,
) -> Result<Vec<TimeWindow>, BookingError> {
    let busy = gateway.list_busy_windows(ctx, calendar_id, range.start(), range.end());
    let held = bounded_store(
        ctx,
        store_timeout,
        "find_active_in_range",
        reservations.find_active_in_range(owner_id, range),
    );

    let (busy, held) = join(busy, held).await;
    let busy = busy.map_err(on_gateway_error)?;
    let held = held?;

    let mut windows = busy;
    windows.extend(held.iter().map(|r| r.window));
    Ok(merge_windows(windows))
}
