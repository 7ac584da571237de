//! The owner API seam driven by the wake-up controller.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::AuthClient;
use crate::config::OwnerApiConfig;
use crate::error::{OwnerApiError, OwnerApiResult};
use crate::token::{TokenState, TokenStore};
use crate::vehicle::VehicleClient;

const USER_AGENT: &str = concat!("goe2tesla/", env!("CARGO_PKG_VERSION"));

/// Operations the wake-up sequence needs from the remote API.
///
/// Implemented by `OwnerClient` over HTTP and by `MockOwnerApi` in tests.
#[async_trait]
pub trait OwnerApi: Send + Sync {
    /// See [`AuthClient::ensure_valid`].
    async fn ensure_valid(&self, state: &TokenState) -> OwnerApiResult<TokenState>;

    /// Delete the persisted token.
    fn clear_token(&self) -> OwnerApiResult<()>;

    async fn resolve_id(&self, token: &str, vin: &str) -> OwnerApiResult<String>;

    async fn wake_up(&self, token: &str, id: &str) -> OwnerApiResult<()>;

    async fn get_status(&self, token: &str, vin: &str) -> OwnerApiResult<String>;
}

/// HTTP-backed owner API.
pub struct OwnerClient {
    auth: AuthClient,
    vehicles: VehicleClient,
}

impl OwnerClient {
    pub fn new(config: OwnerApiConfig, store: Arc<dyn TokenStore>) -> OwnerApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OwnerApiError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            auth: AuthClient::new(http.clone(), config.clone(), store),
            vehicles: VehicleClient::new(http, config),
        })
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn vehicles(&self) -> &VehicleClient {
        &self.vehicles
    }
}

#[async_trait]
impl OwnerApi for OwnerClient {
    async fn ensure_valid(&self, state: &TokenState) -> OwnerApiResult<TokenState> {
        self.auth.ensure_valid(state).await
    }

    fn clear_token(&self) -> OwnerApiResult<()> {
        self.auth.store().clear()
    }

    async fn resolve_id(&self, token: &str, vin: &str) -> OwnerApiResult<String> {
        self.vehicles.resolve_id(token, vin).await
    }

    async fn wake_up(&self, token: &str, id: &str) -> OwnerApiResult<()> {
        self.vehicles.wake_up(token, id).await
    }

    async fn get_status(&self, token: &str, vin: &str) -> OwnerApiResult<String> {
        self.vehicles.get_status(token, vin).await
    }
}
