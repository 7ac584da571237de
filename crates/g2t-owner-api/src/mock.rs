//! In-memory token store and scripted owner API for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use g2t_protocol::owner::TokenResponse;

use crate::client::OwnerApi;
use crate::error::{OwnerApiError, OwnerApiResult};
use crate::token::{TokenState, TokenStore};

// ── MemoryTokenStore ──────────────────────────────────────────

/// Token store that keeps the raw response in memory and counts calls.
#[derive(Default)]
pub struct MemoryTokenStore {
    raw: Mutex<Option<String>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a persisted raw response (not validated).
    pub fn with_token(raw: &str) -> Self {
        let store = Self::new();
        *store.raw.lock().unwrap() = Some(raw.to_string());
        store
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> OwnerApiResult<Option<TokenResponse>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.raw.lock().unwrap().as_deref() {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| OwnerApiError::Decode(e.to_string())),
        }
    }

    fn save(&self, raw: &str) -> OwnerApiResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.raw.lock().unwrap() = Some(raw.to_string());
        Ok(())
    }

    fn clear(&self) -> OwnerApiResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.raw.lock().unwrap() = None;
        Ok(())
    }
}

// ── MockOwnerApi ──────────────────────────────────────────────

/// Scripted owner API.
///
/// Status polls pop from a queue (falling back to `"asleep"` once it is
/// empty); failures are injected per operation by count.
pub struct MockOwnerApi {
    vehicle_id: String,
    vin: String,
    statuses: Mutex<VecDeque<String>>,
    auth_failures: AtomicUsize,
    wake_failures: AtomicUsize,
    vehicle_missing: bool,
    ensure_calls: AtomicUsize,
    logins: AtomicUsize,
    resolve_calls: AtomicUsize,
    wake_calls: AtomicUsize,
    status_calls: AtomicUsize,
    clear_calls: AtomicUsize,
}

impl MockOwnerApi {
    pub fn new(vin: &str) -> Self {
        Self {
            vehicle_id: "1234567890".into(),
            vin: vin.to_string(),
            statuses: Mutex::new(VecDeque::new()),
            auth_failures: AtomicUsize::new(0),
            wake_failures: AtomicUsize::new(0),
            vehicle_missing: false,
            ensure_calls: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
            wake_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
        }
    }

    /// Queue the states returned by successive status polls.
    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        *self.statuses.lock().unwrap() = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Fail the next `count` token checks with HTTP 401.
    pub fn with_auth_failures(self, count: usize) -> Self {
        self.auth_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Fail the next `count` wake requests with HTTP 408.
    pub fn with_wake_failures(self, count: usize) -> Self {
        self.wake_failures.store(count, Ordering::SeqCst);
        self
    }

    /// The account does not contain the VIN.
    pub fn with_missing_vehicle(mut self) -> Self {
        self.vehicle_missing = true;
        self
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    /// Token checks that had to mint a new token.
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn wake_calls(&self) -> usize {
        self.wake_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl OwnerApi for MockOwnerApi {
    async fn ensure_valid(&self, state: &TokenState) -> OwnerApiResult<TokenState> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.auth_failures) {
            return Err(OwnerApiError::Auth {
                context: "login",
                status: 401,
                body: r#"{"error":"invalid_grant"}"#.into(),
            });
        }
        if state.has_access_token() {
            return Ok(state.clone());
        }
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenState {
            access_token: Some(format!("mock-access-{n}")),
            refresh_token: Some(format!("mock-refresh-{n}")),
            valid_until: DateTime::<Utc>::MAX_UTC,
        })
    }

    fn clear_token(&self) -> OwnerApiResult<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_id(&self, _token: &str, vin: &str) -> OwnerApiResult<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.vehicle_missing || vin != self.vin {
            return Err(OwnerApiError::VehicleNotFound {
                vin: vin.to_string(),
            });
        }
        Ok(self.vehicle_id.clone())
    }

    async fn wake_up(&self, _token: &str, id: &str) -> OwnerApiResult<()> {
        self.wake_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.wake_failures) {
            return Err(OwnerApiError::Api {
                context: "wake up",
                status: 408,
                body: format!("vehicle {id} unavailable"),
            });
        }
        Ok(())
    }

    async fn get_status(&self, _token: &str, _vin: &str) -> OwnerApiResult<String> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "asleep".to_string()))
    }
}
