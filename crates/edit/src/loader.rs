#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use hookedit_api::{ApiError, WebhookApi};
use hookedit_core::{Entity, FieldSelector, Webhook, WebhookIds};
use metrics::counter;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::FetchError;

/// What a view sees of the fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready(Arc<Webhook>),
    Failed(FetchError),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Fetches one webhook per mount and publishes the result.
///
/// The background fetch owns the sending half of the state channel; once the
/// loader is dropped the send fails and the late result is discarded.
pub struct EntityLoader {
    api: Arc<dyn WebhookApi>,
    ids: WebhookIds,
    selector: FieldSelector,
    state_rx: watch::Receiver<LoadState>,
    state_tx: Option<watch::Sender<LoadState>>,
}

impl EntityLoader {
    pub fn new(api: Arc<dyn WebhookApi>, ids: WebhookIds, selector: FieldSelector) -> Self {
        let (tx, rx) = watch::channel(LoadState::Loading);
        Self { api, ids, selector, state_rx: rx, state_tx: Some(tx) }
    }

    /// Fetch `ids` restricted to `selector`. Failures come back typed, never panic.
    ///
    /// Returns the typed schema so the form can render it; [`project`] gives
    /// the field map the diff works on.
    pub async fn load(api: &dyn WebhookApi, ids: &WebhookIds, selector: FieldSelector) -> Result<Webhook, FetchError> {
        let t0 = Instant::now();
        counter!("webhook_fetch_total", 1u64);
        match api.get(ids, selector).await {
            Ok(webhook) => {
                info!(webhook = %ids, took_ms = %t0.elapsed().as_millis(), "loader: fetch ok");
                Ok(webhook)
            }
            Err(e) => {
                counter!("webhook_fetch_err", 1u64);
                warn!(webhook = %ids, error = %e, "loader: fetch failed");
                Err(FetchError(e))
            }
        }
    }

    /// [`Self::load`] followed by [`project`].
    pub async fn load_entity(api: &dyn WebhookApi, ids: &WebhookIds, selector: FieldSelector) -> Result<Entity, FetchError> {
        let webhook = Self::load(api, ids, selector).await?;
        project(&webhook, selector)
    }

    /// Start the session's single fetch. Returns false if it was already started.
    pub fn mount(&mut self) -> bool {
        let Some(tx) = self.state_tx.take() else {
            debug!(webhook = %self.ids, "loader: already mounted; not fetching again");
            return false;
        };
        let api = self.api.clone();
        let ids = self.ids.clone();
        let selector = self.selector;
        tokio::spawn(async move {
            let state = match Self::load(api.as_ref(), &ids, selector).await {
                Ok(webhook) => LoadState::Ready(Arc::new(webhook)),
                Err(e) => LoadState::Failed(e),
            };
            if tx.send(state).is_err() {
                debug!(webhook = %ids, "loader: view unmounted; dropping fetch result");
            }
        });
        true
    }

    pub fn is_mounted(&self) -> bool {
        self.state_tx.is_none()
    }

    pub fn state(&self) -> LoadState {
        self.state_rx.borrow().clone()
    }

    /// Wait until the fetch resolves. Stays `Loading` if the fetch task died.
    pub async fn settled(&mut self) -> LoadState {
        loop {
            {
                let cur = self.state_rx.borrow_and_update();
                if !cur.is_loading() {
                    return cur.clone();
                }
            }
            if self.state_rx.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

/// Field map of `webhook` restricted to `selector`; a schema mismatch is a decode failure.
pub fn project(webhook: &Webhook, selector: FieldSelector) -> Result<Entity, FetchError> {
    Entity::from_webhook(webhook, selector).map_err(|e| FetchError(ApiError::Decode(e.to_string())))
}
