//! Owner API client.
//!
//! - `TokenStore` / `FileTokenStore`: the persisted token file
//! - `AuthClient`: password and refresh grants, `ensure_valid` policy
//! - `VehicleClient`: vehicle list, VIN resolution, wake-up
//! - `OwnerApi`: the seam the wake-up controller drives, with
//!   `OwnerClient` for production and `MockOwnerApi` for tests

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod token;
pub mod vehicle;

pub use auth::AuthClient;
pub use client::{OwnerApi, OwnerClient};
pub use config::OwnerApiConfig;
pub use error::{OwnerApiError, OwnerApiResult};
pub use mock::{MemoryTokenStore, MockOwnerApi};
pub use token::{FileTokenStore, TokenState, TokenStore};
pub use vehicle::VehicleClient;
