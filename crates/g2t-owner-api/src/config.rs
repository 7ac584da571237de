use std::time::Duration;

use serde::Deserialize;

/// Owner API connection and account settings.
///
/// The OAuth client id/secret are configuration, never compiled in.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerApiConfig {
    /// API base URL without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// OAuth client id. Overridable with `TESLA_CLIENT_ID`.
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret. Overridable with `TESLA_CLIENT_SECRET`.
    #[serde(default)]
    pub client_secret: String,
    /// Account email. Overridable with `TESLA_EMAIL`.
    #[serde(default)]
    pub email: String,
    /// Account password. Overridable with `TESLA_PASSWORD`.
    #[serde(default)]
    pub password: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://owner-api.teslamotors.com".into()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for OwnerApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: String::new(),
            client_secret: String::new(),
            email: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OwnerApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL with any trailing slash removed.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
