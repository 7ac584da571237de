//! Wake-up controller: token check → resolve → wake → poll until online.
//!
//! Every owner API error (auth, HTTP, unknown VIN) is caught here and
//! funneled through the same recovery path: log, cool down, clear the
//! token, retry from the token check. The retry budget is an explicit
//! loop counter; running past it yields [`WakeOutcome::Exhausted`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use g2t_owner_api::{OwnerApi, OwnerApiError, OwnerApiResult, TokenState};
use g2t_protocol::owner::STATE_ONLINE;

use crate::notifier::Notifier;

/// Retry and timing knobs for one wake sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct WakeConfig {
    /// Wake + poll rounds before giving up softly.
    #[serde(default = "default_max_wake_attempts")]
    pub max_wake_attempts: u32,
    /// Wait between a wake request and the status poll. Real hardware
    /// takes about a minute to come up.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    /// Wait after an API failure before clearing the token and retrying.
    #[serde(default = "default_auth_cooldown_secs")]
    pub auth_cooldown_secs: u64,
    /// API failures tolerated before giving up for good.
    #[serde(default = "default_max_auth_retries")]
    pub max_auth_retries: u32,
}

fn default_max_wake_attempts() -> u32 {
    3
}
fn default_settle_secs() -> u64 {
    60
}
fn default_auth_cooldown_secs() -> u64 {
    15
}
fn default_max_auth_retries() -> u32 {
    3
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            max_wake_attempts: default_max_wake_attempts(),
            settle_secs: default_settle_secs(),
            auth_cooldown_secs: default_auth_cooldown_secs(),
            max_auth_retries: default_max_auth_retries(),
        }
    }
}

impl WakeConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn auth_cooldown(&self) -> Duration {
        Duration::from_secs(self.auth_cooldown_secs)
    }
}

/// Terminal result of one `handle_wake_up` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    /// The vehicle reported `"online"` after `attempts` wake requests.
    Online { attempts: u32 },
    /// Every wake request went through but the vehicle never came online.
    /// The token is kept.
    NotOnline { attempts: u32, last_state: String },
    /// The API failed more often than the retry budget allows.
    Exhausted,
}

/// Something that can run a wake sequence. The watcher and scheduler
/// only see this trait.
#[async_trait]
pub trait WakeHandler: Send + Sync {
    async fn handle_wake_up(&self) -> WakeOutcome;
}

pub struct WakeUpController {
    api: Arc<dyn OwnerApi>,
    vin: String,
    config: WakeConfig,
    session: Mutex<TokenState>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl WakeUpController {
    pub fn new(api: Arc<dyn OwnerApi>, vin: impl Into<String>, config: WakeConfig) -> Self {
        Self {
            api,
            vin: vin.into(),
            config,
            session: Mutex::new(TokenState::empty()),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Snapshot of the in-memory token state.
    pub async fn token_state(&self) -> TokenState {
        self.session.lock().await.clone()
    }

    fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message);
        }
    }

    async fn refresh_session(&self, session: &mut TokenState) -> OwnerApiResult<String> {
        *session = self.api.ensure_valid(session).await?;
        Ok(session.bearer()?.to_string())
    }

    /// One pass from the token check to a terminal poll result.
    async fn attempt(&self, session: &mut TokenState) -> OwnerApiResult<WakeOutcome> {
        let token = self.refresh_session(session).await?;

        let id = self.api.resolve_id(&token, &self.vin).await?;
        tracing::info!(vin = %self.vin, vehicle_id = %id, "resolved vehicle");

        let mut last_state = String::new();
        for attempt in 1..=self.config.max_wake_attempts {
            let token = if attempt == 1 {
                token.clone()
            } else {
                self.refresh_session(session).await?
            };

            tracing::info!(attempt, max = self.config.max_wake_attempts, "waking up vehicle");
            self.api.wake_up(&token, &id).await?;

            tokio::time::sleep(self.config.settle()).await;

            let state = self.api.get_status(&token, &self.vin).await?;
            if state == STATE_ONLINE {
                tracing::info!(attempt, "woke up vehicle");
                return Ok(WakeOutcome::Online { attempts: attempt });
            }

            tracing::warn!(attempt, state = %state, "vehicle not online yet");
            self.notify(&format!(
                "Vehicle reports state '{state}' after wake-up attempt {attempt}"
            ));
            last_state = state;
        }

        tracing::warn!(
            attempts = self.config.max_wake_attempts,
            last_state = %last_state,
            "vehicle did not come online"
        );
        self.notify(&format!(
            "Vehicle did not come online after {} attempts (last state '{last_state}')",
            self.config.max_wake_attempts
        ));
        Ok(WakeOutcome::NotOnline {
            attempts: self.config.max_wake_attempts,
            last_state,
        })
    }

    async fn recover(&self, session: &mut TokenState, error: &OwnerApiError) {
        tracing::error!(
            error = %error,
            status = ?error.status(),
            body = error.body().unwrap_or_default(),
            cooldown_secs = self.config.auth_cooldown_secs,
            "owner API failure, clearing token"
        );
        self.notify(&format!("Owner API failure: {error}"));

        tokio::time::sleep(self.config.auth_cooldown()).await;

        session.clear();
        if let Err(e) = self.api.clear_token() {
            tracing::warn!(error = %e, "failed to delete token file");
        }
    }
}

#[async_trait]
impl WakeHandler for WakeUpController {
    async fn handle_wake_up(&self) -> WakeOutcome {
        let mut session = self.session.lock().await;
        let mut retry_count: u32 = 0;

        loop {
            match self.attempt(&mut session).await {
                Ok(outcome) => return outcome,
                Err(e) => {
                    self.recover(&mut session, &e).await;
                    retry_count += 1;

                    if retry_count > self.config.max_auth_retries {
                        tracing::error!(retries = retry_count, "giving up on wake-up");
                        self.notify(&format!(
                            "Giving up waking vehicle after {retry_count} failed attempts"
                        ));
                        return WakeOutcome::Exhausted;
                    }

                    tracing::info!(
                        retry = retry_count,
                        max = self.config.max_auth_retries,
                        "retrying wake-up from token check"
                    );
                }
            }
        }
    }
}
