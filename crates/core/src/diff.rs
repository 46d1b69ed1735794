//! Field-level entity maps and the selective diff between them.
//!
//! An [`Entity`] maps [`WebhookField`]s to JSON values so nested message
//! configs compare structurally. [`compute_diff`] walks the edited entity and
//! keeps only the fields whose value moved away from the original.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::{CoreError, FieldSelector, Webhook, WebhookField};

/// Field map of a webhook: a fetched baseline or a form's candidate.
///
/// `null` is the clear sentinel: the form sets a field to `null` to unset it
/// remotely. A field missing from the map is untouched, never cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    fields: BTreeMap<WebhookField, Json>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a webhook through `selector`. Identity is always kept.
    pub fn from_webhook(webhook: &Webhook, selector: FieldSelector) -> Result<Self, CoreError> {
        let raw = serde_json::to_value(webhook).map_err(|e| CoreError::Encoding(e.to_string()))?;
        let mut fields = BTreeMap::new();
        if let Json::Object(map) = raw {
            for (k, v) in map {
                // Wire keys outside the closed field set are not ours to track
                let Ok(field) = k.parse::<WebhookField>() else { continue };
                if field == WebhookField::Ids || selector.contains(field) {
                    fields.insert(field, v);
                }
            }
        }
        Ok(Self { fields })
    }

    /// Rebuild a typed webhook. Cleared (`null`) fields come back as `None`.
    pub fn to_webhook(&self) -> Result<Webhook, CoreError> {
        serde_json::from_value(self.to_json()).map_err(|e| CoreError::Encoding(e.to_string()))
    }

    pub fn get(&self, field: WebhookField) -> Option<&Json> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: WebhookField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn set(&mut self, field: WebhookField, value: impl Serialize) -> Result<(), CoreError> {
        let v = serde_json::to_value(value).map_err(|e| CoreError::Encoding(e.to_string()))?;
        self.fields.insert(field, v);
        Ok(())
    }

    pub fn set_value(&mut self, field: WebhookField, value: Json) {
        self.fields.insert(field, value);
    }

    /// Mark a field for clearing on the remote side.
    pub fn clear(&mut self, field: WebhookField) {
        self.fields.insert(field, Json::Null);
    }

    /// Forget a field: the diff will treat it as untouched.
    pub fn remove(&mut self, field: WebhookField) -> Option<Json> {
        self.fields.remove(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WebhookField, &Json)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge a patch into this entity; `null` values drop the field.
    pub fn apply(&mut self, patch: &Patch) {
        for (field, value) in patch.iter() {
            if value.is_null() {
                self.fields.remove(&field);
            } else {
                self.fields.insert(field, value.clone());
            }
        }
    }

    pub fn to_json(&self) -> Json {
        let map = self
            .fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(f, v)| (f.name().to_string(), v.clone()))
            .collect();
        Json::Object(map)
    }
}

/// Minimal set of changed fields for a remote update.
///
/// Built only by [`compute_diff`]; there is no way to decode one from the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Patch {
    fields: BTreeMap<WebhookField, Json>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: WebhookField) -> Option<&Json> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: WebhookField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WebhookField, &Json)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    /// Field mask covering exactly the changed fields.
    pub fn paths(&self) -> Vec<&'static str> {
        self.fields.keys().map(|f| f.name()).collect()
    }

    /// Patch body keyed by wire names (`null` kept, it clears remotely).
    pub fn to_json(&self) -> Json {
        Json::Object(self.fields.iter().map(|(f, v)| (f.name().to_string(), v.clone())).collect())
    }

    /// Count how the patch moves `original`: new fields, changed fields, cleared fields.
    pub fn summarize(&self, original: &Entity) -> PatchSummary {
        let mut s = PatchSummary::default();
        for (field, value) in self.iter() {
            if value.is_null() {
                s.clears += 1;
            } else if original.get(field).map_or(true, Json::is_null) {
                s.adds += 1;
            } else {
                s.updates += 1;
            }
        }
        s
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSummary {
    pub adds: usize,
    pub updates: usize,
    pub clears: usize,
}

/// Missing on the baseline and `null` both mean "unset".
fn unchanged(original: Option<&Json>, edited: &Json) -> bool {
    match original {
        Some(o) => o == edited,
        None => edited.is_null(),
    }
}

/// Diff `edited` against `original`, skipping `excluded` fields.
///
/// Only fields present in `edited` are considered; values are compared by
/// deep structural equality (object key order does not matter).
pub fn compute_diff(original: &Entity, edited: &Entity, excluded: &[WebhookField]) -> Patch {
    let mut fields = BTreeMap::new();
    for (field, value) in edited.iter() {
        if excluded.contains(&field) {
            continue;
        }
        if unchanged(original.get(field), value) {
            continue;
        }
        fields.insert(field, value.clone());
    }
    Patch { fields }
}
