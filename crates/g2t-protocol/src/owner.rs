//! Owner API request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are refreshed this long before the server-side expiry.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 3600;

/// Vehicle state reported once the car is awake.
pub const STATE_ONLINE: &str = "online";

/// Body returned by both token grants, persisted verbatim in the token file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Issue time, seconds since the Unix epoch.
    pub created_at: i64,
    /// Lifetime in seconds.
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Epoch seconds after which the access token should be refreshed:
    /// `created_at + expires_in - 3600`.
    pub fn valid_until_epoch(&self) -> i64 {
        self.created_at
            .saturating_add(self.expires_in)
            .saturating_sub(TOKEN_SAFETY_MARGIN_SECS)
    }

    pub fn valid_until(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.valid_until_epoch(), 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// `grant_type=password` request body.
#[derive(Debug, Serialize)]
pub struct PasswordGrant<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> PasswordGrant<'a> {
    pub fn new(client_id: &'a str, client_secret: &'a str, email: &'a str, password: &'a str) -> Self {
        Self {
            grant_type: "password",
            client_id,
            client_secret,
            email,
            password,
        }
    }
}

/// `grant_type=refresh_token` request body.
#[derive(Debug, Serialize)]
pub struct RefreshGrant<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

impl<'a> RefreshGrant<'a> {
    pub fn new(client_id: &'a str, client_secret: &'a str, refresh_token: &'a str) -> Self {
        Self {
            grant_type: "refresh_token",
            client_id,
            client_secret,
            refresh_token,
        }
    }
}

/// One entry of the vehicle list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSummary {
    /// Opaque numeric id used in per-vehicle URLs.
    pub id: u64,
    pub vin: String,
    /// `"online"`, `"asleep"`, `"offline"`, ...
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl VehicleSummary {
    pub fn is_online(&self) -> bool {
        self.state == STATE_ONLINE
    }
}

/// `GET /api/1/vehicles` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleList {
    pub response: Vec<VehicleSummary>,
    #[serde(default)]
    pub count: usize,
}
