//! hookedit core types: webhook schema, identifiers, field selector, patch and diff.

#![forbid(unsafe_code)]

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod diff;
pub mod fields;

pub use diff::{compute_diff, Entity, Patch, PatchSummary};
pub use fields::{FieldSelector, WebhookField, IDENTITY_FIELDS, WEBHOOK_SELECTOR};

pub mod prelude {
    pub use super::{
        compute_diff, Entity, FieldSelector, MessageConfig, Patch, PatchSummary, Webhook, WebhookField,
        WebhookFormat, WebhookIds, IDENTITY_FIELDS, WEBHOOK_SELECTOR,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("invalid {kind} id {value:?}: expected 3-36 lowercase alphanumerics separated by single dashes")]
    InvalidId { kind: &'static str, value: String },
    #[error("unknown webhook field: {0}")]
    UnknownField(String),
    #[error("field {0} is not tracked by this editor")]
    UntrackedField(WebhookField),
    #[error("encoding: {0}")]
    Encoding(String),
}

const MAX_ID_LEN: usize = 36;

fn check_id(kind: &'static str, value: &str) -> Result<(), CoreError> {
    static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9](?:-?[a-z0-9]){2,}$").unwrap());
    if value.len() > MAX_ID_LEN || !ID_RE.is_match(value) {
        return Err(CoreError::InvalidId { kind, value: value.to_string() });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationIdentifiers {
    pub application_id: String,
}

/// Composite identity of a webhook: owning application + webhook id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebhookIds {
    pub application_ids: ApplicationIdentifiers,
    pub webhook_id: String,
}

impl WebhookIds {
    pub fn new(application_id: &str, webhook_id: &str) -> Result<Self, CoreError> {
        check_id("application", application_id)?;
        check_id("webhook", webhook_id)?;
        Ok(Self {
            application_ids: ApplicationIdentifiers { application_id: application_id.to_string() },
            webhook_id: webhook_id.to_string(),
        })
    }

    pub fn application_id(&self) -> &str {
        &self.application_ids.application_id
    }

    pub fn webhook_id(&self) -> &str {
        &self.webhook_id
    }

    /// Console list view the editor returns to after a delete.
    pub fn list_path(&self) -> String {
        integrations_path(self.application_id())
    }

    /// Console path of the edit view itself (breadcrumb target).
    pub fn edit_path(&self) -> String {
        format!("{}/{}", self.list_path(), self.webhook_id)
    }
}

impl fmt::Display for WebhookIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.application_id(), self.webhook_id)
    }
}

pub fn integrations_path(application_id: &str) -> String {
    format!("/console/applications/{}/integrations", application_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFormat {
    Json,
    Protobuf,
}

/// Per-event forwarding config. Absent on the webhook means the event is not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Path appended to the base URL.
    #[serde(default)]
    pub path: String,
}

impl MessageConfig {
    pub fn at(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Webhook integration as returned by the remote read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub ids: WebhookIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<WebhookFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink_message: Option<MessageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_accept: Option<MessageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_ack: Option<MessageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_nack: Option<MessageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_sent: Option<MessageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_failed: Option<MessageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_queued: Option<MessageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_solved: Option<MessageConfig>,
}

impl Webhook {
    /// Bare webhook carrying only its identity.
    pub fn new(ids: WebhookIds) -> Self {
        Self {
            ids,
            base_url: None,
            format: None,
            uplink_message: None,
            join_accept: None,
            downlink_ack: None,
            downlink_nack: None,
            downlink_sent: None,
            downlink_failed: None,
            downlink_queued: None,
            location_solved: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_validated() {
        assert!(WebhookIds::new("my-app", "wh1").is_ok());
        assert!(WebhookIds::new("", "wh1").is_err());
        assert!(WebhookIds::new("my-app", "").is_err());
        assert!(WebhookIds::new("My-App", "wh1").is_err());
        assert!(WebhookIds::new("my--app", "wh1").is_err());
        assert!(WebhookIds::new("-app", "wh1").is_err());
        assert!(WebhookIds::new("ab", "wh1").is_err());
        let long = "a".repeat(37);
        let e = WebhookIds::new("app", &long).unwrap_err();
        assert!(matches!(e, CoreError::InvalidId { kind: "webhook", .. }), "e={:?}", e);
    }

    #[test]
    fn console_paths_derive_from_ids() {
        let ids = WebhookIds::new("my-app", "my-hook").unwrap();
        assert_eq!(ids.list_path(), "/console/applications/my-app/integrations");
        assert_eq!(ids.edit_path(), "/console/applications/my-app/integrations/my-hook");
        assert_eq!(ids.to_string(), "my-app/my-hook");
    }

    #[test]
    fn webhook_wire_shape() {
        let v = serde_json::json!({
            "ids": { "application_ids": { "application_id": "app1" }, "webhook_id": "hook1" },
            "base_url": "https://example.com/hooks",
            "format": "json",
            "uplink_message": { "path": "/up" },
            "join_accept": {},
            "created_at": "2019-01-01T00:00:00Z"
        });
        let w: Webhook = serde_json::from_value(v).unwrap();
        assert_eq!(w.ids.application_id(), "app1");
        assert_eq!(w.format, Some(WebhookFormat::Json));
        assert_eq!(w.uplink_message, Some(MessageConfig::at("/up")));
        assert_eq!(w.join_accept, Some(MessageConfig::default()));
        assert!(w.downlink_ack.is_none());

        let back = serde_json::to_value(&w).unwrap();
        assert!(back.get("downlink_ack").is_none());
        assert!(back.get("created_at").is_none());
    }
}
