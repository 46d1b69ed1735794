//! REST client for the application server's webhook endpoints.
//!
//! - `GET    /api/v3/as/webhooks/{app}/{webhook}?field_mask=a,b,c`
//! - `PUT    /api/v3/as/webhooks/{app}/{webhook}` with `{webhook, field_mask}`
//! - `DELETE /api/v3/as/webhooks/{app}/{webhook}`

#![forbid(unsafe_code)]

use std::time::Instant;

use hookedit_core::{FieldSelector, Patch, Webhook, WebhookIds};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value as Json;
use tracing::{info, warn};

use crate::{ApiConfig, ApiError, ApiResult, WebhookApi};

/// HTTP implementation of [`WebhookApi`].
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

/// Body of a field-masked update. Identity stays in the URL.
pub fn update_body(patch: &Patch) -> Json {
    serde_json::json!({
        "webhook": patch.to_json(),
        "field_mask": { "paths": patch.paths() },
    })
}

fn map_reqwest(e: reqwest::Error) -> ApiError {
    if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else {
        ApiError::Transport(e.to_string())
    }
}

impl HttpApi {
    pub fn new(cfg: &ApiConfig) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &cfg.api_key {
            let mut v = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| ApiError::Config(format!("invalid api key: {}", e)))?;
            v.set_sensitive(true);
            headers.insert(AUTHORIZATION, v);
        }
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self::with_client(client, &cfg.base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn webhook_url(&self, ids: &WebhookIds) -> String {
        format!("{}/api/v3/as/webhooks/{}/{}", self.base_url, ids.application_id(), ids.webhook_id())
    }

    /// Pass 2xx responses through; turn anything else into a classified [`ApiError`].
    async fn ensure_success(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::from_status(status.as_u16(), body));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl WebhookApi for HttpApi {
    async fn get(&self, ids: &WebhookIds, selector: FieldSelector) -> ApiResult<Webhook> {
        let t0 = Instant::now();
        info!(app = %ids.application_id(), webhook = %ids.webhook_id(), fields = selector.len(), "api: get start");
        let resp = self
            .client
            .get(self.webhook_url(ids))
            .query(&[("field_mask", selector.to_mask())])
            .send()
            .await
            .map_err(map_reqwest)?;
        let resp = Self::ensure_success(resp).await?;
        let webhook = resp.json::<Webhook>().await.map_err(map_reqwest)?;
        if &webhook.ids != ids {
            warn!(got = %webhook.ids, want = %ids, "api: get returned a different identity");
        }
        info!(took_ms = %t0.elapsed().as_millis(), "api: get ok");
        Ok(webhook)
    }

    async fn update(&self, ids: &WebhookIds, patch: &Patch) -> ApiResult<()> {
        let t0 = Instant::now();
        info!(app = %ids.application_id(), webhook = %ids.webhook_id(), paths = ?patch.paths(), "api: update start");
        let resp = self
            .client
            .put(self.webhook_url(ids))
            .json(&update_body(patch))
            .send()
            .await
            .map_err(map_reqwest)?;
        Self::ensure_success(resp).await?;
        info!(took_ms = %t0.elapsed().as_millis(), "api: update ok");
        Ok(())
    }

    async fn delete(&self, ids: &WebhookIds) -> ApiResult<()> {
        let t0 = Instant::now();
        info!(app = %ids.application_id(), webhook = %ids.webhook_id(), "api: delete start");
        let resp = self.client.delete(self.webhook_url(ids)).send().await.map_err(map_reqwest)?;
        Self::ensure_success(resp).await?;
        info!(took_ms = %t0.elapsed().as_millis(), "api: delete ok");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookedit_core::{compute_diff, Entity, WebhookField, IDENTITY_FIELDS};
    use serde_json::json;

    #[test]
    fn webhook_url_joins_ids_and_trims_slash() {
        let api = HttpApi::with_client(reqwest::Client::new(), "https://as.example.com/");
        let ids = WebhookIds::new("my-app", "my-hook").unwrap();
        assert_eq!(api.webhook_url(&ids), "https://as.example.com/api/v3/as/webhooks/my-app/my-hook");
    }

    #[test]
    fn update_body_masks_only_patched_fields() {
        let original: Entity = serde_json::from_value(json!({
            "ids": { "application_ids": { "application_id": "app" }, "webhook_id": "hook" },
            "base_url": "http://a",
            "uplink_message": { "path": "/up" }
        }))
        .unwrap();
        let mut edited = original.clone();
        edited.set(WebhookField::BaseUrl, "http://b").unwrap();
        edited.clear(WebhookField::UplinkMessage);
        let patch = compute_diff(&original, &edited, IDENTITY_FIELDS);

        assert_eq!(
            update_body(&patch),
            json!({
                "webhook": { "base_url": "http://b", "uplink_message": null },
                "field_mask": { "paths": ["base_url", "uplink_message"] }
            })
        );
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let mut cfg = ApiConfig::new("http://localhost");
        cfg.api_key = Some("bad\nkey".into());
        assert!(matches!(HttpApi::new(&cfg), Err(ApiError::Config(_))));
    }
}
