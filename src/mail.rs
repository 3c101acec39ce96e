use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::join;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MailSettings;
use crate::models::booking::BookingRecord;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("mail API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("mail API returned status {0}")]
    Api(reqwest::StatusCode),
}

/// Best-effort booking notifications. Failures are reported to the caller
/// for logging and never affect the booking itself.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, booking: &BookingRecord) -> Result<(), MailError>;
}

/// Client for the transactional mail HTTP API
pub struct MailClient {
    client: Client,
    endpoint: String,
    auth_header: String,
    sender: String,
    admin_email: Option<String>,
}

impl MailClient {
    pub fn new(settings: MailSettings, admin_email: Option<String>) -> Self {
        // The API authenticates with HTTP basic auth, username "api"
        let auth_header = format!(
            "Basic {}",
            BASE64.encode(format!("api:{}", settings.api_key))
        );

        Self {
            client: Client::new(),
            endpoint: settings.api_endpoint,
            auth_header,
            sender: settings.sender,
            admin_email,
        }
    }

    async fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let url = format!("{}/messages", self.endpoint);
        debug!("Sending mail to {} via {}", to, url);

        let params = [
            ("from", self.sender.as_str()),
            ("to", to),
            ("subject", subject),
            ("text", body),
        ];

        let res = self
            .client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .form(&params)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(MailError::Api(res.status()));
        }

        info!("Mail '{}' sent to {}", subject, to);
        Ok(())
    }
}

#[async_trait]
impl Notifier for MailClient {
    /// Send the admin notification (when an admin address is configured)
    /// and the client confirmation. Each send fails independently; the
    /// first failure is returned after both have been attempted.
    async fn notify(&self, booking: &BookingRecord) -> Result<(), MailError> {
        let confirmation_body = format!(
            "Hello {},\n\nyour appointment from {} to {} is confirmed.\n\nSee you then!",
            booking.name, booking.start_time, booking.end_time
        );
        let confirmation = self.send_message(&booking.email, "Appointment confirmed", &confirmation_body);

        let admin = async {
            match &self.admin_email {
                Some(address) => {
                    let body = format!(
                        "New booking by {} <{}> (phone: {}) from {} to {}.",
                        booking.name,
                        booking.email,
                        if booking.phone.is_empty() { "-" } else { &booking.phone },
                        booking.start_time,
                        booking.end_time
                    );
                    self.send_message(address, "New booking received", &body).await
                }
                None => Ok(()),
            }
        };

        let (confirmation_result, admin_result) = join(confirmation, admin).await;

        if let Err(e) = &confirmation_result {
            warn!("Failed to send confirmation to {}: {}", booking.email, e);
        }
        if let Err(e) = &admin_result {
            warn!("Failed to send admin notification: {}", e);
        }

        confirmation_result.and(admin_result)
    }
}
