#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hookedit_core::{Entity, FieldSelector, Patch, Webhook, WebhookIds, WEBHOOK_SELECTOR};
use tokio::sync::Semaphore;

use crate::{ApiError, ApiResult, WebhookApi};

/// One remote call as seen by [`MockApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Get { ids: WebhookIds, mask: Vec<&'static str> },
    Update { ids: WebhookIds, patch: Patch },
    Delete { ids: WebhookIds },
}

/// Simple in-memory mock implementation for tests.
///
/// Records every call, applies updates to its store, and can inject one-shot
/// failures per operation. A gated mock parks every call until
/// [`MockApi::release`] hands out a permit, so callers can observe in-flight
/// state.
#[derive(Default)]
pub struct MockApi {
    webhooks: Mutex<HashMap<WebhookIds, Webhook>>,
    calls: Mutex<Vec<MockCall>>,
    fail_get: Mutex<Option<ApiError>>,
    fail_update: Mutex<Option<ApiError>>,
    fail_delete: Mutex<Option<ApiError>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self { gate: Some(Arc::new(Semaphore::new(0))), ..Self::default() }
    }

    pub fn with_webhook(self, webhook: Webhook) -> Self {
        self.insert(webhook);
        self
    }

    pub fn insert(&self, webhook: Webhook) {
        self.webhooks.lock().unwrap().insert(webhook.ids.clone(), webhook);
    }

    /// Current stored state, bypassing the call log.
    pub fn stored(&self, ids: &WebhookIds) -> Option<Webhook> {
        self.webhooks.lock().unwrap().get(ids).cloned()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next_get(&self, err: ApiError) {
        *self.fail_get.lock().unwrap() = Some(err);
    }

    pub fn fail_next_update(&self, err: ApiError) {
        *self.fail_update.lock().unwrap() = Some(err);
    }

    pub fn fail_next_delete(&self, err: ApiError) {
        *self.fail_delete.lock().unwrap() = Some(err);
    }

    /// Let `n` parked calls through (gated mocks only).
    pub fn release(&self, n: usize) {
        if let Some(g) = &self.gate {
            g.add_permits(n);
        }
    }

    async fn pass_gate(&self) {
        if let Some(g) = &self.gate {
            if let Ok(permit) = g.acquire().await {
                permit.forget();
            }
        }
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found(ids: &WebhookIds) -> ApiError {
        ApiError::NotFound(format!("webhook {} not found", ids))
    }
}

#[async_trait::async_trait]
impl WebhookApi for MockApi {
    async fn get(&self, ids: &WebhookIds, selector: FieldSelector) -> ApiResult<Webhook> {
        self.record(MockCall::Get { ids: ids.clone(), mask: selector.paths() });
        self.pass_gate().await;
        if let Some(e) = self.fail_get.lock().unwrap().take() {
            return Err(e);
        }
        let stored = self.stored(ids).ok_or_else(|| Self::not_found(ids))?;
        // Serve only the selected fields, like the field mask does remotely
        Entity::from_webhook(&stored, selector)
            .and_then(|e| e.to_webhook())
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn update(&self, ids: &WebhookIds, patch: &Patch) -> ApiResult<()> {
        self.record(MockCall::Update { ids: ids.clone(), patch: patch.clone() });
        self.pass_gate().await;
        if let Some(e) = self.fail_update.lock().unwrap().take() {
            return Err(e);
        }
        let mut store = self.webhooks.lock().unwrap();
        let current = store.get(ids).ok_or_else(|| Self::not_found(ids))?;
        let mut entity = Entity::from_webhook(current, WEBHOOK_SELECTOR).map_err(|e| ApiError::Decode(e.to_string()))?;
        entity.apply(patch);
        let updated = entity.to_webhook().map_err(|e| ApiError::Decode(e.to_string()))?;
        store.insert(ids.clone(), updated);
        Ok(())
    }

    async fn delete(&self, ids: &WebhookIds) -> ApiResult<()> {
        self.record(MockCall::Delete { ids: ids.clone() });
        self.pass_gate().await;
        if let Some(e) = self.fail_delete.lock().unwrap().take() {
            return Err(e);
        }
        self.webhooks.lock().unwrap().remove(ids).map(|_| ()).ok_or_else(|| Self::not_found(ids))
    }
}
