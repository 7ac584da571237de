//! Password and refresh-token grants, and the token validity policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use g2t_protocol::owner::{PasswordGrant, RefreshGrant, TokenResponse};

use crate::config::OwnerApiConfig;
use crate::error::{OwnerApiError, OwnerApiResult};
use crate::token::{TokenState, TokenStore};

/// Performs token grants against `/oauth/token` and persists the results.
pub struct AuthClient {
    http: reqwest::Client,
    config: OwnerApiConfig,
    store: Arc<dyn TokenStore>,
}

impl AuthClient {
    pub fn new(http: reqwest::Client, config: OwnerApiConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            config,
            store,
        }
    }

    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    /// Return a usable token, acquiring one if needed.
    ///
    /// Priority, re-evaluated on every call: token file, then a fresh
    /// login, then a refresh once `valid_until` has passed. A held token
    /// that is still valid is returned without any HTTP call.
    pub async fn ensure_valid(&self, state: &TokenState) -> OwnerApiResult<TokenState> {
        self.ensure_valid_at(state, Utc::now()).await
    }

    pub async fn ensure_valid_at(
        &self,
        state: &TokenState,
        now: DateTime<Utc>,
    ) -> OwnerApiResult<TokenState> {
        let mut state = state.clone();

        if !state.has_access_token() {
            match self.store.load() {
                Ok(Some(response)) => {
                    tracing::info!("reading token from token file");
                    state = TokenState::from_response(&response);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable token file"),
            }
        }

        if !state.has_access_token() {
            tracing::info!("logging into owner API");
            let state = self.login().await?;
            tracing::info!(valid_until = %state.valid_until, "logged into owner API");
            return Ok(state);
        }

        if state.needs_refresh(now) {
            tracing::info!(valid_until = %state.valid_until, "refreshing owner API token");
            let refresh_token = state
                .refresh_token
                .as_deref()
                .ok_or(OwnerApiError::MissingToken)?;
            let state = self.refresh(refresh_token).await?;
            tracing::info!(valid_until = %state.valid_until, "refreshed owner API token");
            return Ok(state);
        }

        Ok(state)
    }

    /// Exchange account credentials for a new token pair.
    pub async fn login(&self) -> OwnerApiResult<TokenState> {
        let body = PasswordGrant::new(
            &self.config.client_id,
            &self.config.client_secret,
            &self.config.email,
            &self.config.password,
        );
        self.exchange("login", "password", &body).await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> OwnerApiResult<TokenState> {
        let body = RefreshGrant::new(
            &self.config.client_id,
            &self.config.client_secret,
            refresh_token,
        );
        self.exchange("token refresh", "refresh_token", &body).await
    }

    async fn exchange<B: Serialize>(
        &self,
        context: &'static str,
        grant_type: &str,
        body: &B,
    ) -> OwnerApiResult<TokenState> {
        let url = format!("{}/oauth/token", self.config.base());

        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(OwnerApiError::Auth {
                context,
                status: status.as_u16(),
                body: text,
            });
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| OwnerApiError::Decode(format!("{context} response: {e}")))?;

        if let Err(e) = self.store.save(&text) {
            tracing::warn!(error = %e, "failed to persist token file");
        }

        Ok(TokenState::from_response(&token))
    }
}
