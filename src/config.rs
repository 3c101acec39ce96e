use std::env;

use dotenv::dotenv;
use tracing::info;

/// Mail API settings. Present only when the environment carries the full set.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub api_endpoint: String,
    pub api_key: String,
    pub sender: String,
}

/// Calendar API settings. Present only when credentials exist and the
/// feature flag is on.
#[derive(Debug, Clone)]
pub struct CalendarSettings {
    pub api_endpoint: String,
    pub token_endpoint: String,
    pub calendar_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Application configuration assembled from the environment at startup.
///
/// Optional blocks model optional capabilities: a missing mail or calendar
/// configuration disables that integration without error.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: String,
    pub admin_email: Option<String>,
    pub mail: Option<MailSettings>,
    pub calendar: Option<CalendarSettings>,
}

impl AppConfig {
    /// Load configuration from the environment (reading `.env` if present).
    pub fn from_env() -> Self {
        dotenv().ok();

        let port = env::var("PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(3000);

        let data_dir = env::var("BOOKING_DATA_DIR").unwrap_or_else(|_| "/app/data".to_string());

        let admin_email = env::var("ADMIN_EMAIL").ok();

        let mail = match (
            env::var("MAIL_API_ENDPOINT").ok(),
            env::var("MAIL_API_KEY").ok(),
            env::var("MAIL_SENDER").ok(),
        ) {
            (Some(api_endpoint), Some(api_key), Some(sender)) => {
                info!("Mail notifications enabled with sender {}", sender);
                Some(MailSettings {
                    api_endpoint,
                    api_key,
                    sender,
                })
            }
            _ => {
                info!("Mail configuration incomplete or absent - notifications disabled");
                None
            }
        };

        let calendar_enabled = env::var("CALENDAR_SYNC_ENABLED")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);

        let calendar = if calendar_enabled {
            match (
                env::var("CALENDAR_ID").ok(),
                env::var("CALENDAR_CLIENT_ID").ok(),
                env::var("CALENDAR_CLIENT_SECRET").ok(),
                env::var("CALENDAR_REFRESH_TOKEN").ok(),
            ) {
                (Some(calendar_id), Some(client_id), Some(client_secret), Some(refresh_token)) => {
                    info!("Calendar sync enabled for calendar {}", calendar_id);
                    Some(CalendarSettings {
                        api_endpoint: env::var("CALENDAR_API_ENDPOINT").unwrap_or_else(|_| {
                            "https://www.googleapis.com/calendar/v3".to_string()
                        }),
                        token_endpoint: env::var("CALENDAR_TOKEN_ENDPOINT")
                            .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
                        calendar_id,
                        client_id,
                        client_secret,
                        refresh_token,
                    })
                }
                _ => {
                    info!("CALENDAR_SYNC_ENABLED is set but credentials are incomplete - calendar sync disabled");
                    None
                }
            }
        } else {
            info!("Calendar sync disabled");
            None
        };

        Self {
            port,
            data_dir,
            admin_email,
            mail,
            calendar,
        }
    }
}
