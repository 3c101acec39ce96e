use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CalendarSettings;
use crate::models::booking::BookingRecord;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("calendar API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("calendar API returned status {0}")]
    Api(reqwest::StatusCode),
    #[error("token exchange returned status {0}")]
    TokenExchange(reqwest::StatusCode),
    #[error("calendar API response carried no event id")]
    MissingEventId,
}

/// Best-effort mirror of a booking into an external calendar. Returns the
/// created event's reference; failures are reported to the caller for
/// logging and never affect the booking itself.
#[async_trait]
pub trait CalendarSync: Send + Sync {
    async fn create_event(&self, booking: &BookingRecord) -> Result<String, CalendarError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    id: Option<String>,
}

/// Client for the calendar REST API, authenticating with an OAuth2
/// refresh token
pub struct CalendarClient {
    client: Client,
    settings: CalendarSettings,
}

impl CalendarClient {
    pub fn new(settings: CalendarSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    // Exchange the long-lived refresh token for a short-lived access token
    async fn fetch_access_token(&self) -> Result<String, CalendarError> {
        debug!("Requesting calendar access token");

        let params = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("refresh_token", self.settings.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let res = self
            .client
            .post(&self.settings.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(CalendarError::TokenExchange(res.status()));
        }

        let token = res.json::<TokenResponse>().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl CalendarSync for CalendarClient {
    async fn create_event(&self, booking: &BookingRecord) -> Result<String, CalendarError> {
        let access_token = self.fetch_access_token().await?;

        let url = format!(
            "{}/calendars/{}/events",
            self.settings.api_endpoint, self.settings.calendar_id
        );

        let event = json!({
            "summary": format!("Appointment: {}", booking.name),
            "description": format!(
                "Booked by {} <{}>{}",
                booking.name,
                booking.email,
                if booking.phone.is_empty() {
                    String::new()
                } else {
                    format!(", phone {}", booking.phone)
                }
            ),
            "start": { "dateTime": booking.start_time.to_rfc3339() },
            "end": { "dateTime": booking.end_time.to_rfc3339() },
        });

        debug!("Creating calendar event for booking {}", booking.id);

        let res = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&event)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(CalendarError::Api(res.status()));
        }

        let created = res.json::<EventResponse>().await?;
        let event_id = created.id.ok_or(CalendarError::MissingEventId)?;

        info!(
            "Created calendar event {} for booking {}",
            event_id, booking.id
        );
        Ok(event_id)
    }
}
