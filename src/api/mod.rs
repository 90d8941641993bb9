//! Admin backend interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Injected bearer-token providers
//! - [`client`] - Main API client with URL builders and CRUD calls
//! - [`error`] - Error taxonomy shared by the whole crate
//! - [`http`] - HTTP wrapper and response normalization
//!
//! # Example
//!
//! ```ignore
//! use cellar_admin::api::{ApiClient, ApiHttpClient, AuthContext, StaticToken};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let auth = AuthContext::new(StaticToken::new("token"));
//!     let client = ApiClient::new("http://localhost:5000/api", auth, ApiHttpClient::new()?)?;
//!     let products = client.list("products", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;

pub use auth::{AuthContext, StaticToken, StoredToken, TokenProvider};
pub use client::ApiClient;
pub use error::ApiError;
pub use http::{ApiHttpClient, ApiResponse, Download, FileField, PageMeta, Payload};
