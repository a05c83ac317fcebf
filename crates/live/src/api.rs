// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the lottery backend's auth and notification endpoints.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

/// Body of a successful token refresh. Rotating backends also return a new
/// refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder().timeout(Duration::from_secs(10)).build().unwrap_or_default();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh: &str) -> anyhow::Result<RefreshResponse> {
        let resp = self
            .client
            .post(self.url("/users/token/refresh/"))
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("refresh failed ({status}): {text}");
        }

        Ok(resp.json().await?)
    }

    /// Tell the backend to blacklist `refresh`.
    pub async fn logout(&self, refresh: &str) -> anyhow::Result<()> {
        self.client
            .post(self.url("/users/logout/"))
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Register a push subscription for the user behind `access`. Returns
    /// whether the backend accepted it.
    pub async fn subscribe_notifications(
        &self,
        access: &str,
        subscription: &str,
    ) -> anyhow::Result<bool> {
        let resp = self
            .client
            .post(self.url("/notifications/subscribe"))
            .bearer_auth(access)
            .json(&serde_json::json!({ "subscription": subscription }))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }
}
