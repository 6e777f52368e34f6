//! Calendar adapters.
//!
//! - `GoogleCalendarGateway` - Google Calendar v3 over HTTPS
//! - `MockCalendarGateway` - Configurable in-process gateway for tests

mod google_gateway;
mod mock_gateway;

pub use google_gateway::{GoogleCalendarConfig, GoogleCalendarGateway, GOOGLE_CALENDAR_API_BASE};
pub use mock_gateway::MockCalendarGateway;
