//! HTTP client for the Railgun API
//!
//! [`ApiClient`] owns a single reqwest session between [`ApiClient::open`] and
//! [`ApiClient::close`]. Tool handlers only see the [`RailgunApi`] trait.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{ToolError, ToolResult};

/// Query string pairs for GET requests
pub type Query = [(&'static str, String)];

#[async_trait]
pub trait RailgunApi: Send + Sync {
    async fn get(&self, endpoint: &str, params: &Query) -> ToolResult;

    async fn post(&self, endpoint: &str, body: &Value) -> ToolResult;
}

pub struct ApiClient {
    api_url: String,
    credential: Option<String>,
    session: RwLock<Option<reqwest::Client>>,
}

impl ApiClient {
    /// Create a closed client. Call [`ApiClient::open`] before issuing requests.
    pub fn new(api_url: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            credential,
            session: RwLock::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.railgun_api_url.clone(),
            settings.credential().map(String::from),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_open(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Create the HTTP session. Opening an open client is a no-op.
    pub fn open(&self) -> ToolResult<()> {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if session.is_some() {
            return Ok(());
        }

        let credential = self.credential.as_deref().ok_or_else(missing_credential)?;
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential))
            .map_err(|e| ToolError::Config(format!("Invalid API credential: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(concat!("railgun-mcp/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        *session = Some(client);
        info!(api_url = %self.api_url, "Railgun API client opened");
        Ok(())
    }

    /// Release the HTTP session. Closing a closed client is a no-op.
    pub fn close(&self) {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if session.take().is_some() {
            info!("Railgun API client closed");
        }
    }

    fn session(&self) -> ToolResult<reqwest::Client> {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        match session.as_ref() {
            Some(client) => Ok(client.clone()),
            None if self.credential.is_none() => Err(missing_credential()),
            None => Err(ToolError::Config("Railgun API client is not open".to_string())),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_url, endpoint)
    }
}

fn missing_credential() -> ToolError {
    ToolError::Config(
        "RAILGUN_API_KEY not configured. Set it in environment or ~/.railgun/config.json"
            .to_string(),
    )
}

/// Decode a response body, or turn an unexpected status into [`ToolError::Api`]
async fn read_json(response: Response, accepted: &[StatusCode]) -> ToolResult {
    let status = response.status();
    if !accepted.contains(&status) {
        let body = response.text().await.unwrap_or_default();
        return Err(ToolError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ToolError::decode(format!("invalid JSON body: {}", e)))
}

#[async_trait]
impl RailgunApi for ApiClient {
    async fn get(&self, endpoint: &str, params: &Query) -> ToolResult {
        let session = self.session()?;
        debug!(endpoint, "GET");

        let response = session.get(self.url(endpoint)).query(params).send().await?;
        read_json(response, &[StatusCode::OK]).await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> ToolResult {
        let session = self.session()?;
        debug!(endpoint, "POST");

        let response = session.post(self.url(endpoint)).json(body).send().await?;
        read_json(response, &[StatusCode::OK, StatusCode::CREATED]).await
    }
}
