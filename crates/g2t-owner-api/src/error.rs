//! Owner API error types.

use thiserror::Error;

/// Errors surfaced by the token store and the owner API clients.
#[derive(Debug, Error)]
pub enum OwnerApiError {
    /// Non-success status from a token grant.
    #[error("{context} failed with HTTP {status}")]
    Auth {
        context: &'static str,
        status: u16,
        body: String,
    },

    /// Non-success status from a vehicle endpoint.
    #[error("{context} failed with HTTP {status}")]
    Api {
        context: &'static str,
        status: u16,
        body: String,
    },

    #[error("vehicle {vin} not found in account")]
    VehicleNotFound { vin: String },

    #[error("no access token held")]
    MissingToken,

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("token store error: {0}")]
    Store(String),
}

impl OwnerApiError {
    /// HTTP status carried by `Auth`/`Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body carried by `Auth`/`Api` errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Auth { body, .. } | Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OwnerApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Convenience alias for owner API results.
pub type OwnerApiResult<T> = Result<T, OwnerApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_exposes_status_and_body() {
        let err = OwnerApiError::Auth {
            context: "login",
            status: 401,
            body: r#"{"error":"invalid_grant"}"#.into(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.body(), Some(r#"{"error":"invalid_grant"}"#));
        assert_eq!(err.to_string(), "login failed with HTTP 401");
    }

    #[test]
    fn not_found_has_no_status() {
        let err = OwnerApiError::VehicleNotFound { vin: "5YJ3".into() };
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("5YJ3"));
    }
}
