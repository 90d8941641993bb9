//! Admin API Client
//!
//! Main client for the marketplace admin backend, combining authentication
//! and HTTP functionality.

use super::auth::AuthContext;
use super::error::ApiError;
use super::http::{ApiHttpClient, ApiResponse, Download, Payload};
use anyhow::{Context, Result};
use reqwest::Method;

/// Main admin API client
#[derive(Clone)]
pub struct ApiClient {
    pub auth: AuthContext,
    pub http: ApiHttpClient,
    base_url: String,
}

impl ApiClient {
    /// Create a new client against `base_url` (e.g. `https://api.example.com/api`)
    pub fn new(base_url: &str, auth: AuthContext, http: ApiHttpClient) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("API base URL must be http or https: {}", base_url);
        }

        Ok(Self {
            auth,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a collection URL, e.g. `products` -> `{base}/products`
    pub fn collection_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_matches('/'))
    }

    /// Build an item URL, e.g. `products`, `42` -> `{base}/products/42`
    pub fn item_url(&self, path: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(path), urlencoding::encode(id))
    }

    // =========================================================================
    // Requests
    // =========================================================================

    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        payload: Option<&Payload>,
    ) -> Result<ApiResponse, ApiError> {
        let token = self.auth.bearer().await?;
        let result = self.http.send(method, url, &token, query, payload).await;
        if let Err(ref e) = result {
            if e.is_authentication() {
                self.auth.invalidate().await;
            }
        }
        result
    }

    /// `GET /{path}?query`
    pub async fn list(&self, path: &str, query: &[(String, String)]) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, &self.collection_url(path), query, None)
            .await
    }

    /// `POST /{path}`
    pub async fn create(&self, path: &str, payload: &Payload) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, &self.collection_url(path), &[], Some(payload))
            .await
    }

    /// `PUT /{path}/{id}`
    pub async fn update(
        &self,
        path: &str,
        id: &str,
        payload: &Payload,
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::PUT, &self.item_url(path, id), &[], Some(payload))
            .await
    }

    /// `DELETE /{path}/{id}`
    pub async fn delete(&self, path: &str, id: &str) -> Result<ApiResponse, ApiError> {
        self.send(Method::DELETE, &self.item_url(path, id), &[], None)
            .await
    }

    /// `GET /{path}?query` returning the raw body
    pub async fn export(&self, path: &str, query: &[(String, String)]) -> Result<Download, ApiError> {
        let token = self.auth.bearer().await?;
        let result = self
            .http
            .download(&self.collection_url(path), &token, query)
            .await;
        if let Err(ref e) = result {
            if e.is_authentication() {
                self.auth.invalidate().await;
            }
        }
        result
    }
}
