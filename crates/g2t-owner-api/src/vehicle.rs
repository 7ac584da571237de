//! Vehicle list, VIN resolution, and wake-up requests.

use g2t_protocol::owner::{VehicleList, VehicleSummary};

use crate::config::OwnerApiConfig;
use crate::error::{OwnerApiError, OwnerApiResult};

/// Authenticated calls against `/api/1/vehicles`.
pub struct VehicleClient {
    http: reqwest::Client,
    config: OwnerApiConfig,
}

impl VehicleClient {
    pub fn new(http: reqwest::Client, config: OwnerApiConfig) -> Self {
        Self { http, config }
    }

    /// List every vehicle on the account.
    pub async fn list_vehicles(&self, token: &str) -> OwnerApiResult<Vec<VehicleSummary>> {
        let url = format!("{}/api/1/vehicles", self.config.base());
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(OwnerApiError::Api {
                context: "vehicle list",
                status: status.as_u16(),
                body: text,
            });
        }

        let list: VehicleList = serde_json::from_str(&text)
            .map_err(|e| OwnerApiError::Decode(format!("vehicle list: {e}")))?;
        Ok(list.response)
    }

    /// Look up the vehicle with the given VIN (first match).
    pub async fn find(&self, token: &str, vin: &str) -> OwnerApiResult<VehicleSummary> {
        self.list_vehicles(token)
            .await?
            .into_iter()
            .find(|v| v.vin == vin)
            .ok_or_else(|| OwnerApiError::VehicleNotFound {
                vin: vin.to_string(),
            })
    }

    /// Resolve the opaque id used in per-vehicle URLs.
    pub async fn resolve_id(&self, token: &str, vin: &str) -> OwnerApiResult<String> {
        Ok(self.find(token, vin).await?.id.to_string())
    }

    /// Current `state` string of the vehicle (`"online"`, `"asleep"`, ...).
    pub async fn get_status(&self, token: &str, vin: &str) -> OwnerApiResult<String> {
        Ok(self.find(token, vin).await?.state)
    }

    /// Ask the vehicle to wake up. The response body is not needed.
    pub async fn wake_up(&self, token: &str, id: &str) -> OwnerApiResult<()> {
        let url = format!("{}/api/1/vehicles/{id}/wake_up", self.config.base());
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .body("")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OwnerApiError::Api {
                context: "wake up",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
