#![doc = "Live Homebox API client: bridges the core `HomeboxApi` trait to the Homebox REST API over reqwest."]
//
//! # Homebox client (CLI <-> Core)
//!
//! [`HomeboxClient`] is the network-backed implementation of
//! [`homebox_export_core::contract::HomeboxApi`]. The core export pipeline only ever
//! sees the trait; this module owns URLs, headers, the session token and the mapping
//! of HTTP failures onto [`ApiError`].
//!
//! - Construct with a [`ClientConfig`] (base URL plus optional request timeout).
//! - Call `login` first; the returned token is kept and sent as the `Authorization`
//!   header on every later request.
//! - Every non-2xx response becomes [`ApiError::Status`] carrying the status code and body.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use homebox_export_core::contract::{
    AttachmentStream, HomeboxApi, Item, PaginationResult, TokenResponse,
};
use homebox_export_core::error::ApiError;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-request timeout. `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
    stay_logged_in: bool,
}

pub struct HomeboxClient {
    base_url: Url,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl HomeboxClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            tracing::error!(error = %e, base_url = %config.base_url, "Invalid Homebox base URL");
            ApiError::InvalidUrl(format!("{}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(
            base_url = %base_url,
            timeout_secs = config.timeout.map(|t| t.as_secs()),
            "Initialized HomeboxClient"
        );
        Ok(Self {
            base_url,
            http,
            token: RwLock::new(None),
        })
    }

    /// Ends the server session. The stored token is dropped even if the call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["users", "logout"])?;
        let req = self.request(Method::POST, url).await;
        let result = self.send(req).await.map(|_| ());
        *self.token.write().await = None;
        result
    }

    /// `<base>/api/v1/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.http.request(method, url);
        match self.token.read().await.as_deref() {
            Some(token) => req.header(AUTHORIZATION, token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = req.send().await.map_err(|e| {
            tracing::error!(error = %e, "Request to Homebox failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            let url = resp.url().clone();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to read response body>"));
            tracing::error!(status = %status, url = %url, body = %body, "Homebox returned an error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let req = self.request(Method::GET, url).await;
        let resp = self.send(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HomeboxApi for HomeboxClient {
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        tracing::info!(username, "Logging in to Homebox");
        let url = self.endpoint(&["users", "login"])?;
        let form = LoginForm {
            username,
            password,
            stay_logged_in: false,
        };
        let req = self.request(Method::POST, url).await.json(&form);
        let resp = self.send(req).await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        *self.token.write().await = Some(token.token.clone());
        tracing::debug!(expires_at = %token.expires_at, "Stored session token");
        Ok(token)
    }

    async fn list_items(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<PaginationResult<Item>, ApiError> {
        let mut url = self.endpoint(&["items"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &page_size.to_string());
        tracing::debug!(page, page_size, "Listing items");
        self.get_json(url).await
    }

    async fn get_item(&self, id: &str) -> Result<Item, ApiError> {
        let url = self.endpoint(&["items", id])?;
        tracing::debug!(item_id = id, "Fetching item");
        self.get_json(url).await
    }

    async fn download_attachment(
        &self,
        item_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentStream, ApiError> {
        let url = self.endpoint(&["items", item_id, "attachments", attachment_id])?;
        tracing::debug!(item_id, attachment_id, "Downloading attachment");
        let req = self.request(Method::GET, url).await;
        let resp = self.send(req).await?;

        Ok(resp
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| ApiError::Transport(format!("failed to read attachment body: {e}")))
            .boxed())
    }
}
