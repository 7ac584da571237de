//! Token state and its persistence.
//!
//! The token file holds the last raw grant response verbatim. It is
//! rewritten on every successful login/refresh and deleted when the API
//! rejects our credentials.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use g2t_protocol::owner::TokenResponse;

use crate::error::{OwnerApiError, OwnerApiResult};

/// In-memory access/refresh token pair.
///
/// `valid_until` is only meaningful while `access_token` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub valid_until: DateTime<Utc>,
}

impl TokenState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_response(response: &TokenResponse) -> Self {
        Self {
            access_token: Some(response.access_token.clone()),
            refresh_token: Some(response.refresh_token.clone()),
            valid_until: response.valid_until(),
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// True once `now` has reached the early-refresh deadline.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }

    /// The access token to send as `Authorization: Bearer ...`.
    pub fn bearer(&self) -> OwnerApiResult<&str> {
        self.access_token
            .as_deref()
            .ok_or(OwnerApiError::MissingToken)
    }

    pub fn clear(&mut self) {
        *self = Self::empty();
    }
}

/// Persistence for the raw grant response.
///
/// File I/O is synchronous: there is a single writer and the file is tiny.
pub trait TokenStore: Send + Sync {
    /// Load the persisted response. `Ok(None)` when nothing is stored.
    fn load(&self) -> OwnerApiResult<Option<TokenResponse>>;

    /// Persist a raw grant response body, replacing any previous one.
    fn save(&self, raw: &str) -> OwnerApiResult<()>;

    /// Remove the persisted response. Clearing an empty store is not an error.
    fn clear(&self) -> OwnerApiResult<()>;
}

/// Token store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> OwnerApiResult<Option<TokenResponse>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OwnerApiError::Store(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| OwnerApiError::Decode(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, raw: &str) -> OwnerApiResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OwnerApiError::Store(format!("{}: {e}", parent.display())))?;
        }

        // Write-then-rename: readers never see a partial token file.
        let temp = self.temp_path();
        std::fs::write(&temp, raw)
            .map_err(|e| OwnerApiError::Store(format!("{}: {e}", temp.display())))?;
        std::fs::rename(&temp, &self.path)
            .map_err(|e| OwnerApiError::Store(format!("{}: {e}", self.path.display())))
    }

    fn clear(&self) -> OwnerApiResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OwnerApiError::Store(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_store() -> FileTokenStore {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("g2t-token-{}-{n}", std::process::id()));
        FileTokenStore::new(dir.join("token.json"))
    }

    const RAW: &str = r#"{"access_token":"at-1","refresh_token":"rt-1","created_at":1700000000,"expires_in":3888000,"token_type":"bearer"}"#;

    #[test]
    fn load_missing_file_is_none() {
        let store = temp_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let store = temp_store();
        store.save(RAW).unwrap();

        let token = store.load().unwrap().expect("token should be stored");
        assert_eq!(token.access_token, "at-1");
        assert_eq!(token.expires_in, 3_888_000);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), RAW);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn save_overwrites() {
        let store = temp_store();
        store.save(RAW).unwrap();
        store
            .save(&RAW.replace("at-1", "at-2"))
            .unwrap();
        assert_eq!(store.load().unwrap().unwrap().access_token, "at-2");
    }

    #[test]
    fn clear_removes_file_and_is_idempotent() {
        let store = temp_store();
        store.save(RAW).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn malformed_file_is_decode_error() {
        let store = temp_store();
        store.save("{\"access_token\": 42").unwrap();
        assert!(matches!(store.load(), Err(OwnerApiError::Decode(_))));
    }

    #[test]
    fn token_state_from_response() {
        let response: TokenResponse = serde_json::from_str(RAW).unwrap();
        let state = TokenState::from_response(&response);
        assert_eq!(state.bearer().unwrap(), "at-1");
        assert_eq!(state.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(
            state.valid_until.timestamp(),
            1_700_000_000 + 3_888_000 - 3600
        );
        assert!(!state.needs_refresh(DateTime::from_timestamp(1_700_000_000, 0).unwrap()));
        assert!(state.needs_refresh(state.valid_until));
    }

    #[test]
    fn cleared_state_has_no_bearer() {
        let response: TokenResponse = serde_json::from_str(RAW).unwrap();
        let mut state = TokenState::from_response(&response);
        state.clear();
        assert!(!state.has_access_token());
        assert!(matches!(state.bearer(), Err(OwnerApiError::MissingToken)));
    }
}
