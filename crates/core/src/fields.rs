//! Webhook field names and the fixed selectors built from them.
//!
//! Field names are a closed set: anything outside [`WebhookField`] is never
//! read or written by the editor.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookField {
    /// Composite identity; used for addressing, never diffed.
    Ids,
    BaseUrl,
    Format,
    UplinkMessage,
    JoinAccept,
    DownlinkAck,
    DownlinkNack,
    DownlinkSent,
    DownlinkFailed,
    DownlinkQueued,
    LocationSolved,
}

impl WebhookField {
    pub const ALL: [WebhookField; 11] = [
        WebhookField::Ids,
        WebhookField::BaseUrl,
        WebhookField::Format,
        WebhookField::UplinkMessage,
        WebhookField::JoinAccept,
        WebhookField::DownlinkAck,
        WebhookField::DownlinkNack,
        WebhookField::DownlinkSent,
        WebhookField::DownlinkFailed,
        WebhookField::DownlinkQueued,
        WebhookField::LocationSolved,
    ];

    /// Wire name, as used in JSON bodies and field masks.
    pub const fn name(self) -> &'static str {
        match self {
            WebhookField::Ids => "ids",
            WebhookField::BaseUrl => "base_url",
            WebhookField::Format => "format",
            WebhookField::UplinkMessage => "uplink_message",
            WebhookField::JoinAccept => "join_accept",
            WebhookField::DownlinkAck => "downlink_ack",
            WebhookField::DownlinkNack => "downlink_nack",
            WebhookField::DownlinkSent => "downlink_sent",
            WebhookField::DownlinkFailed => "downlink_failed",
            WebhookField::DownlinkQueued => "downlink_queued",
            WebhookField::LocationSolved => "location_solved",
        }
    }

    /// True for the per-event `{path}` message fields.
    pub const fn is_message(self) -> bool {
        !matches!(self, WebhookField::Ids | WebhookField::BaseUrl | WebhookField::Format)
    }
}

impl fmt::Display for WebhookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WebhookField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WebhookField::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| CoreError::UnknownField(s.to_string()))
    }
}

/// Ordered, statically declared set of fields to fetch and track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelector(&'static [WebhookField]);

impl FieldSelector {
    pub const fn new(fields: &'static [WebhookField]) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &'static [WebhookField] {
        self.0
    }

    pub fn contains(&self, field: WebhookField) -> bool {
        self.0.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field mask paths in selector order.
    pub fn paths(&self) -> Vec<&'static str> {
        self.0.iter().map(|f| f.name()).collect()
    }

    /// Comma-joined mask for query strings.
    pub fn to_mask(&self) -> String {
        self.paths().join(",")
    }
}

/// Fields the webhook editor fetches and tracks.
pub const WEBHOOK_SELECTOR: FieldSelector = FieldSelector::new(&[
    WebhookField::BaseUrl,
    WebhookField::Format,
    WebhookField::UplinkMessage,
    WebhookField::JoinAccept,
    WebhookField::DownlinkAck,
    WebhookField::DownlinkNack,
    WebhookField::DownlinkSent,
    WebhookField::DownlinkFailed,
    WebhookField::DownlinkQueued,
    WebhookField::LocationSolved,
]);

/// Identity fields, excluded from every patch.
pub const IDENTITY_FIELDS: &[WebhookField] = &[WebhookField::Ids];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_selector_is_exact_and_ordered() {
        assert_eq!(
            WEBHOOK_SELECTOR.paths(),
            vec![
                "base_url",
                "format",
                "uplink_message",
                "join_accept",
                "downlink_ack",
                "downlink_nack",
                "downlink_sent",
                "downlink_failed",
                "downlink_queued",
                "location_solved",
            ]
        );
        assert!(!WEBHOOK_SELECTOR.contains(WebhookField::Ids));
    }

    #[test]
    fn field_names_roundtrip_through_from_str() {
        for f in WebhookField::ALL {
            assert_eq!(f.name().parse::<WebhookField>().unwrap(), f);
            // serde and name() must agree
            assert_eq!(serde_json::to_value(f).unwrap(), serde_json::json!(f.name()));
        }
        let err = "payload_template".parse::<WebhookField>().unwrap_err();
        assert!(err.to_string().contains("payload_template"), "err={}", err);
    }
}
