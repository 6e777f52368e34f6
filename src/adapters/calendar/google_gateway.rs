//! Google Calendar gateway.
//!
//! - Busy windows come from the `freeBusy` endpoint.
//! - Events are created with `conferenceDataVersion=1` so a Meet link can
//!   be attached.
//! - A 401 invalidates the credential and retries once with a fresh one.
//! - Network errors, timeouts, 429 and 5xx map to `Unavailable`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::domain::foundation::TimeWindow;
use crate::ports::{
    CalendarGateway, CreatedEvent, Credential, CredentialError, CredentialProvider, EventInput,
    GatewayError, RequestContext,
};

pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone)]
pub struct GoogleCalendarConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Whether Google should email attendees about created and deleted events.
    pub notify_attendees: bool,
}

impl Default for GoogleCalendarConfig {
    fn default() -> Self {
        Self {
            base_url: GOOGLE_CALENDAR_API_BASE.to_string(),
            request_timeout: Duration::from_secs(10),
            notify_attendees: true,
        }
    }
}

impl GoogleCalendarConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_notify_attendees(mut self, notify: bool) -> Self {
        self.notify_attendees = notify;
        self
    }
}

pub struct GoogleCalendarGateway {
    config: GoogleCalendarConfig,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl GoogleCalendarGateway {
    pub fn new(
        config: GoogleCalendarConfig,
        client: Client,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            config,
            client,
            credentials,
        }
    }

    /// `{base}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(self.config.base_url.trim_end_matches('/'))
            .map_err(|e| GatewayError::InvalidInput(format!("bad calendar base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidInput("calendar base url cannot be a base".into()))?
            .extend(segments);
        Ok(url)
    }

    fn send_updates(&self) -> &'static str {
        if self.config.notify_attendees {
            "all"
        } else {
            "none"
        }
    }

    async fn acquire(&self, ctx: &RequestContext) -> Result<Credential, GatewayError> {
        self.credentials.acquire(ctx).await.map_err(|e| match e {
            CredentialError::Cancelled => GatewayError::Cancelled,
            other => GatewayError::Credential(other),
        })
    }

    async fn send(&self, ctx: &RequestContext, request: RequestBuilder) -> Result<Response, GatewayError> {
        ctx.run(self.config.request_timeout, request.send())
            .await?
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Unavailable(format!("request timed out: {}", e))
                } else {
                    GatewayError::Unavailable(format!("request failed: {}", e))
                }
            })
    }

    /// Sends an authenticated request; on 401 invalidates and retries exactly once.
    async fn send_authorized<F>(&self, ctx: &RequestContext, build: F) -> Result<Response, GatewayError>
    where
        F: Fn(&Credential) -> RequestBuilder + Send + Sync,
    {
        let credential = self.acquire(ctx).await?;
        let response = self.send(ctx, build(&credential)).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!(
            source = credential.source(),
            request_id = ctx.request_id(),
            "Calendar rejected credential, retrying once with a fresh one"
        );
        self.credentials.invalidate(&credential).await;

        let fresh = self.acquire(ctx).await?;
        let response = self.send(ctx, build(&fresh)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = self.read_text(ctx, response).await;
            return Err(GatewayError::Unauthorized(body));
        }
        Ok(response)
    }

    /// Reads the whole body under the same bounds as the request.
    async fn read_body(&self, ctx: &RequestContext, response: Response) -> Result<Vec<u8>, GatewayError> {
        let bytes = ctx
            .run(self.config.request_timeout, response.bytes())
            .await?
            .map_err(|e| GatewayError::Unavailable(format!("reading response failed: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        response: Response,
    ) -> Result<T, GatewayError> {
        let body = self.read_body(ctx, response).await?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::Parse(e.to_string()))
    }

    /// Best-effort body text for error messages; empty if it cannot be read in time.
    async fn read_text(&self, ctx: &RequestContext, response: Response) -> String {
        self.read_body(ctx, response)
            .await
            .map(|body| String::from_utf8_lossy(&body).into_owned())
            .unwrap_or_default()
    }

    async fn error_for_status(&self, ctx: &RequestContext, response: Response) -> GatewayError {
        let status = response.status();
        let body = self.read_text(ctx, response).await;
        let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        match status.as_u16() {
            401 => GatewayError::Unauthorized(message),
            429 | 500..=599 => {
                GatewayError::Unavailable(format!("calendar returned {}: {}", status, message))
            }
            code => GatewayError::Rejected {
                status: code,
                message,
            },
        }
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: String,
    time_max: String,
    items: [FreeBusyItem<'a>; 1],
}

#[derive(Debug, Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    #[serde(default)]
    domain: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
    #[serde(default)]
    hangout_link: Option<String>,
    #[serde(default)]
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryPoint {
    entry_point_type: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

impl GoogleEvent {
    fn into_created(self) -> CreatedEvent {
        let video_link = self.conference_data.and_then(|c| {
            c.entry_points
                .into_iter()
                .find(|e| e.entry_point_type == "video")
                .map(|e| e.uri)
        });
        CreatedEvent {
            event_id: self.id,
            html_link: self.html_link,
            conference_link: video_link.or(self.hangout_link),
        }
    }
}

fn event_body(input: &EventInput) -> serde_json::Value {
    let attendees: Vec<_> = input
        .attendees
        .iter()
        .map(|a| match &a.display_name {
            Some(name) => json!({ "email": a.email, "displayName": name }),
            None => json!({ "email": a.email }),
        })
        .collect();

    let mut body = json!({
        "summary": input.summary,
        "start": { "dateTime": rfc3339(input.window.start()), "timeZone": "UTC" },
        "end": { "dateTime": rfc3339(input.window.end()), "timeZone": "UTC" },
        "attendees": attendees,
    });
    if let Some(description) = &input.description {
        body["description"] = json!(description);
    }
    if input.request_conference {
        body["conferenceData"] = json!({
            "createRequest": {
                "requestId": input.request_id,
                "conferenceSolutionKey": { "type": "hangoutsMeet" }
            }
        });
    }
    body
}

#[async_trait]
impl CalendarGateway for GoogleCalendarGateway {
    async fn list_busy_windows(
        &self,
        ctx: &RequestContext,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeWindow>, GatewayError> {
        if from >= to {
            return Err(GatewayError::InvalidInput(format!(
                "busy window query needs from < to, got {} .. {}",
                from, to
            )));
        }

        let url = self.url(&["freeBusy"])?;
        let body = FreeBusyRequest {
            time_min: rfc3339(from),
            time_max: rfc3339(to),
            items: [FreeBusyItem { id: calendar_id }],
        };

        let response = self
            .send_authorized(ctx, |cred| {
                self.client
                    .post(url.clone())
                    .bearer_auth(cred.access_token())
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(self.error_for_status(ctx, response).await);
        }

        let parsed: FreeBusyResponse = self.read_json(ctx, response).await?;

        let calendar = parsed
            .calendars
            .into_iter()
            .find(|(id, _)| id == calendar_id)
            .map(|(_, c)| c)
            .ok_or_else(|| GatewayError::Parse(format!("calendar {} missing from response", calendar_id)))?;

        if let Some(err) = calendar.errors.first() {
            return Err(match err.reason.as_str() {
                "notFound" => GatewayError::Rejected {
                    status: 404,
                    message: format!("calendar {} not found", calendar_id),
                },
                _ => GatewayError::Unavailable(format!("{}: {}", err.domain, err.reason)),
            });
        }

        let mut windows: Vec<TimeWindow> = calendar
            .busy
            .into_iter()
            .filter_map(|period| {
                let window = TimeWindow::new(period.start.with_timezone(&Utc), period.end.with_timezone(&Utc));
                if window.is_err() {
                    tracing::debug!(
                        start = %period.start,
                        end = %period.end,
                        "Skipping empty busy period"
                    );
                }
                window.ok()
            })
            .collect();
        windows.sort();

        tracing::debug!(
            calendar_id,
            busy = windows.len(),
            request_id = ctx.request_id(),
            "Fetched busy windows"
        );
        Ok(windows)
    }

    async fn create_event(
        &self,
        ctx: &RequestContext,
        calendar_id: &str,
        input: &EventInput,
    ) -> Result<CreatedEvent, GatewayError> {
        let url = self.url(&["calendars", calendar_id, "events"])?;
        let body = event_body(input);
        let send_updates = self.send_updates();

        let response = self
            .send_authorized(ctx, |cred| {
                self.client
                    .post(url.clone())
                    .bearer_auth(cred.access_token())
                    .query(&[("conferenceDataVersion", "1"), ("sendUpdates", send_updates)])
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(self.error_for_status(ctx, response).await);
        }

        let event: GoogleEvent = self.read_json(ctx, response).await?;
        let created = event.into_created();

        tracing::info!(
            calendar_id,
            event_id = %created.event_id,
            request_id = ctx.request_id(),
            "Calendar event created"
        );
        Ok(created)
    }

    async fn delete_event(
        &self,
        ctx: &RequestContext,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), GatewayError> {
        let url = self.url(&["calendars", calendar_id, "events", event_id])?;
        let send_updates = self.send_updates();

        let response = self
            .send_authorized(ctx, |cred| {
                self.client
                    .delete(url.clone())
                    .bearer_auth(cred.access_token())
                    .query(&[("sendUpdates", send_updates)])
            })
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                tracing::debug!(calendar_id, event_id, "Event already gone");
                Ok(())
            }
            _ => Err(self.error_for_status(ctx, response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Attendee;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Hands out `tok-1`, `tok-2`, ... and bumps the counter on invalidate.
    struct SequencedCredentials {
        generation: AtomicUsize,
        invalidated: Mutex<Vec<String>>,
        fail: Option<CredentialError>,
    }

    impl SequencedCredentials {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                generation: AtomicUsize::new(1),
                invalidated: Mutex::new(Vec::new()),
                fail: None,
            })
        }

        fn failing(err: CredentialError) -> Arc<Self> {
            Arc::new(Self {
                generation: AtomicUsize::new(1),
                invalidated: Mutex::new(Vec::new()),
                fail: Some(err),
            })
        }
    }

    #[async_trait]
    impl CredentialProvider for SequencedCredentials {
        async fn acquire(&self, _ctx: &RequestContext) -> Result<Credential, CredentialError> {
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            let n = self.generation.load(Ordering::SeqCst);
            Ok(Credential::new(format!("tok-{}", n), None, "test"))
        }

        async fn invalidate(&self, rejected: &Credential) {
            self.invalidated
                .lock()
                .unwrap()
                .push(rejected.access_token().to_string());
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gateway(server: &MockServer, creds: Arc<SequencedCredentials>) -> GoogleCalendarGateway {
        GoogleCalendarGateway::new(
            GoogleCalendarConfig::default()
                .with_base_url(server.uri())
                .with_request_timeout(Duration::from_millis(500)),
            Client::new(),
            creds,
        )
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 4, h, m, 0).unwrap()
    }

    fn event_input() -> EventInput {
        EventInput {
            summary: "Intro call".to_string(),
            description: Some("Booked online".to_string()),
            window: TimeWindow::new(at(10, 0), at(10, 30)).unwrap(),
            attendees: vec![Attendee {
                email: "grace@example.com".to_string(),
                display_name: Some("Grace".to_string()),
            }],
            request_conference: true,
            request_id: "req-1".to_string(),
        }
    }

    #[tokio::test]
    async fn busy_windows_are_parsed_and_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_partial_json(json!({ "items": [{ "id": "owner@example.com" }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "calendars": {
                    "owner@example.com": {
                        "busy": [
                            { "start": "2030-03-04T14:00:00Z", "end": "2030-03-04T15:00:00Z" },
                            { "start": "2030-03-04T05:00:00-05:00", "end": "2030-03-04T05:30:00-05:00" }
                        ]
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let windows = gateway(&server, SequencedCredentials::new())
            .list_busy_windows(&RequestContext::new(), "owner@example.com", at(0, 0), at(23, 0))
            .await
            .unwrap();

        assert_eq!(
            windows,
            vec![
                TimeWindow::new(at(10, 0), at(10, 30)).unwrap(),
                TimeWindow::new(at(14, 0), at(15, 0)).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn inverted_range_fails_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = gateway(&server, SequencedCredentials::new())
            .list_busy_windows(&RequestContext::new(), "primary", at(10, 0), at(10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unauthorized_is_retried_once_with_fresh_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "calendars": { "primary": { "busy": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let creds = SequencedCredentials::new();
        let windows = gateway(&server, creds.clone())
            .list_busy_windows(&RequestContext::new(), "primary", at(9, 0), at(17, 0))
            .await
            .unwrap();

        assert!(windows.is_empty());
        assert_eq!(*creds.invalidated.lock().unwrap(), vec!["tok-1".to_string()]);
    }

    #[tokio::test]
    async fn persistent_unauthorized_stops_after_one_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let err = gateway(&server, SequencedCredentials::new())
            .list_busy_windows(&RequestContext::new(), "primary", at(9, 0), at(17, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "Backend Error" }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server, SequencedCredentials::new())
            .list_busy_windows(&RequestContext::new(), "primary", at(9, 0), at(17, 0))
            .await
            .unwrap_err();
        match err {
            GatewayError::Unavailable(message) => assert!(message.contains("Backend Error")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_calendar_times_out_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let err = gateway(&server, SequencedCredentials::new())
            .list_busy_windows(&RequestContext::new(), "primary", at(9, 0), at(17, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    /// Answers one request with headers and a truncated body, then goes quiet.
    async fn stalled_body_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 8192];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 1000\r\n\r\n{\"calendars\":",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn stalled_response_body_times_out_as_unavailable() {
        let gateway = GoogleCalendarGateway::new(
            GoogleCalendarConfig::default()
                .with_base_url(stalled_body_server().await)
                .with_request_timeout(Duration::from_millis(200)),
            Client::new(),
            SequencedCredentials::new(),
        );

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            gateway.list_busy_windows(&RequestContext::new(), "primary", at(9, 0), at(17, 0)),
        )
        .await;

        let err = result.expect("body read must be bounded").unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_stalled_body() {
        let gateway = GoogleCalendarGateway::new(
            GoogleCalendarConfig::default()
                .with_base_url(stalled_body_server().await)
                .with_request_timeout(Duration::from_secs(10)),
            Client::new(),
            SequencedCredentials::new(),
        );
        let ctx = RequestContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            gateway.list_busy_windows(&ctx, "primary", at(9, 0), at(17, 0)),
        )
        .await;

        assert_eq!(result.expect("cancellation must interrupt the body read"), Err(GatewayError::Cancelled));
    }

    #[tokio::test]
    async fn credential_failure_is_surfaced() {
        let server = MockServer::start().await;
        let creds = SequencedCredentials::failing(CredentialError::Unavailable {
            attempts: vec!["env: unset".into()],
        });

        let err = gateway(&server, creds)
            .list_busy_windows(&RequestContext::new(), "primary", at(9, 0), at(17, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Credential(CredentialError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn calendar_level_not_found_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "calendars": {
                    "missing": { "busy": [], "errors": [{ "domain": "global", "reason": "notFound" }] }
                }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server, SequencedCredentials::new())
            .list_busy_windows(&RequestContext::new(), "missing", at(9, 0), at(17, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn create_event_returns_conference_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/owner@example.com/events"))
            .and(query_param("conferenceDataVersion", "1"))
            .and(body_partial_json(json!({
                "summary": "Intro call",
                "start": { "dateTime": "2030-03-04T10:00:00Z" },
                "conferenceData": { "createRequest": { "requestId": "req-1" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt-123",
                "htmlLink": "https://calendar.google.com/event?eid=evt-123",
                "conferenceData": {
                    "entryPoints": [
                        { "entryPointType": "phone", "uri": "tel:+1-555-0100" },
                        { "entryPointType": "video", "uri": "https://meet.google.com/abc-defg-hij" }
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = gateway(&server, SequencedCredentials::new())
            .create_event(&RequestContext::new(), "owner@example.com", &event_input())
            .await
            .unwrap();

        assert_eq!(created.event_id, "evt-123");
        assert_eq!(
            created.conference_link.as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
    }

    #[tokio::test]
    async fn create_event_client_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "Forbidden" }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server, SequencedCredentials::new())
            .create_event(&RequestContext::new(), "primary", &event_input())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::Rejected {
                status: 403,
                message: "Forbidden".to_string()
            }
        );
    }

    #[tokio::test]
    async fn deleting_a_missing_event_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt-gone"))
            .respond_with(ResponseTemplate::new(410))
            .expect(1)
            .mount(&server)
            .await;

        gateway(&server, SequencedCredentials::new())
            .delete_event(&RequestContext::new(), "primary", "evt-gone")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let server = MockServer::start().await;
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = gateway(&server, SequencedCredentials::new())
            .list_busy_windows(&ctx, "primary", at(9, 0), at(17, 0))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Cancelled);
    }
}
