#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hookedit_core::{compute_diff, Entity, FieldSelector, Patch, WebhookField, WebhookIds};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::{Collaborators, CommitError, LivenessToken, Severity, DELETE_SUCCESS, UPDATE_SUCCESS};

/// Diffs edited entities against the fetched baseline and commits the result.
///
/// The baseline is never touched after construction, not even after a
/// successful update; a fresh fetch is the only way to re-baseline.
pub struct DiffCommitController {
    deps: Collaborators,
    ids: WebhookIds,
    original: Arc<Entity>,
    excluded: Vec<WebhookField>,
    in_flight: AtomicBool,
    liveness: LivenessToken,
}

/// Clears the in-flight flag when the operation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DiffCommitController {
    pub fn new(
        deps: Collaborators,
        ids: WebhookIds,
        selector: FieldSelector,
        original: Entity,
        liveness: LivenessToken,
    ) -> Self {
        // Identity plus anything the selector does not track stays out of patches
        let excluded = WebhookField::ALL
            .iter()
            .copied()
            .filter(|f| *f == WebhookField::Ids || !selector.contains(*f))
            .collect();
        Self { deps, ids, original: Arc::new(original), excluded, in_flight: AtomicBool::new(false), liveness }
    }

    pub fn ids(&self) -> &WebhookIds {
        &self.ids
    }

    pub fn original(&self) -> &Entity {
        &self.original
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn compute_patch(&self, edited: &Entity) -> Patch {
        compute_diff(&self.original, edited, &self.excluded)
    }

    /// Diff `edited` against the baseline and commit the patch.
    pub async fn submit(&self, edited: &Entity) -> Result<Patch, CommitError> {
        let patch = self.compute_patch(edited);
        self.commit(&patch).await?;
        Ok(patch)
    }

    /// Send `patch` once. An empty patch succeeds without a remote call.
    ///
    /// Patches carrying identity or untracked fields are refused before the
    /// in-flight flag is taken.
    pub async fn commit(&self, patch: &Patch) -> Result<(), CommitError> {
        if let Some(field) = patch.iter().map(|(f, _)| f).find(|f| self.excluded.contains(f)) {
            warn!(webhook = %self.ids, field = %field, "edit: rejected; patch carries an excluded field");
            return Err(CommitError::ExcludedField(field));
        }
        let _guard = self.begin("update")?;
        counter!("webhook_commit_attempts", 1u64);
        if patch.is_empty() {
            counter!("webhook_commit_noop", 1u64);
            info!(webhook = %self.ids, "edit: nothing changed; skipping update call");
        } else {
            let t0 = Instant::now();
            let summary = patch.summarize(&self.original);
            info!(webhook = %self.ids, adds = summary.adds, updates = summary.updates, clears = summary.clears, "edit: committing patch");
            if let Err(e) = self.deps.api.update(&self.ids, patch).await {
                counter!("webhook_commit_err", 1u64);
                warn!(webhook = %self.ids, error = %e, "edit: update failed");
                return Err(CommitError::Update(e));
            }
            histogram!("webhook_commit_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
            counter!("webhook_commit_ok", 1u64);
        }
        if self.liveness.is_alive() {
            self.deps.notifier.notify(UPDATE_SUCCESS, Severity::Success);
        } else {
            debug!(webhook = %self.ids, "edit: view unmounted; dropping update notification");
        }
        Ok(())
    }

    /// Delete the webhook, then notify and return to the integrations list.
    pub async fn delete(&self) -> Result<(), CommitError> {
        let _guard = self.begin("delete")?;
        if let Err(e) = self.deps.api.delete(&self.ids).await {
            counter!("webhook_commit_err", 1u64);
            warn!(webhook = %self.ids, error = %e, "edit: delete failed");
            return Err(CommitError::Delete(e));
        }
        counter!("webhook_delete_ok", 1u64);
        info!(webhook = %self.ids, "edit: webhook deleted");
        if !self.liveness.is_alive() {
            debug!(webhook = %self.ids, "edit: view unmounted; dropping delete notification and navigation");
            return Ok(());
        }
        self.deps.notifier.notify(DELETE_SUCCESS, Severity::Success);
        self.deps.navigator.navigate(&self.ids.list_path());
        Ok(())
    }

    fn begin(&self, op: &'static str) -> Result<InFlight<'_>, CommitError> {
        if self.in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            warn!(webhook = %self.ids, op, "edit: rejected; another operation is in flight");
            return Err(CommitError::Busy);
        }
        Ok(InFlight(&self.in_flight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Liveness, SinkEvent, SinkLog};
    use hookedit_api::{MockApi, MockCall};
    use hookedit_core::{Webhook, IDENTITY_FIELDS, WEBHOOK_SELECTOR};
    use serde_json::json;

    fn setup(api: Arc<MockApi>, live: &Liveness) -> (DiffCommitController, Arc<SinkLog>) {
        let ids = WebhookIds::new("app1", "hook1").unwrap();
        let mut w = Webhook::new(ids.clone());
        w.base_url = Some("http://a".into());
        api.insert(w.clone());
        let sinks = Arc::new(SinkLog::new());
        let deps = Collaborators::new(api, sinks.clone(), sinks.clone());
        let original = Entity::from_webhook(&w, WEBHOOK_SELECTOR).unwrap();
        (DiffCommitController::new(deps, ids, WEBHOOK_SELECTOR, original, live.token()), sinks)
    }

    #[test]
    fn fields_outside_selector_are_excluded() {
        let live = Liveness::new();
        let api = Arc::new(MockApi::new());
        let ids = WebhookIds::new("app1", "hook1").unwrap();
        let sinks = Arc::new(SinkLog::new());
        let narrow = FieldSelector::new(&[WebhookField::BaseUrl]);
        let ctl = DiffCommitController::new(
            Collaborators::new(api, sinks.clone(), sinks),
            ids,
            narrow,
            Entity::new(),
            live.token(),
        );
        let mut edited = Entity::new();
        edited.set(WebhookField::BaseUrl, "http://b").unwrap();
        edited.set(WebhookField::Format, "json").unwrap();
        let patch = ctl.compute_patch(&edited);
        assert_eq!(patch.paths(), vec!["base_url"]);
    }

    #[tokio::test]
    async fn unmounted_view_gets_no_sink_events() {
        let live = Liveness::new();
        let api = Arc::new(MockApi::new());
        let (ctl, sinks) = setup(api.clone(), &live);
        drop(live);
        ctl.delete().await.unwrap();
        assert!(sinks.events().is_empty());
        assert!(matches!(api.calls()[0], MockCall::Delete { .. }));
    }

    #[tokio::test]
    async fn baseline_is_not_rebased_after_update() {
        let live = Liveness::new();
        let api = Arc::new(MockApi::new());
        let (ctl, sinks) = setup(api, &live);
        let mut edited = ctl.original().clone();
        edited.set(WebhookField::BaseUrl, "http://b").unwrap();
        ctl.submit(&edited).await.unwrap();
        // Same candidate again still diffs against the fetched baseline
        let again = ctl.compute_patch(&edited);
        assert_eq!(again.paths(), vec!["base_url"]);
        assert_eq!(
            sinks.events(),
            vec![SinkEvent::Notify { message: UPDATE_SUCCESS.into(), severity: Severity::Success }]
        );
        assert!(!ctl.is_in_flight());
    }

    #[tokio::test]
    async fn patch_carrying_identity_is_refused_before_the_remote() {
        let live = Liveness::new();
        let api = Arc::new(MockApi::new());
        let (ctl, sinks) = setup(api.clone(), &live);
        let mut edited = Entity::new();
        edited
            .set_value(WebhookField::Ids, json!({ "application_ids": { "application_id": "evil" }, "webhook_id": "x" }));
        edited.set(WebhookField::BaseUrl, "http://b").unwrap();
        // diffing without exclusions lets identity through
        let patch = compute_diff(ctl.original(), &edited, &[]);
        assert!(patch.contains(WebhookField::Ids));

        let err = ctl.commit(&patch).await.unwrap_err();
        assert_eq!(err, CommitError::ExcludedField(WebhookField::Ids));
        assert!(api.calls().is_empty());
        assert!(sinks.events().is_empty());
        assert!(!ctl.is_in_flight());
        assert_eq!(api.stored(ctl.ids()).unwrap().base_url.as_deref(), Some("http://a"));
    }

    #[tokio::test]
    async fn patch_with_untracked_field_is_refused() {
        let live = Liveness::new();
        let api = Arc::new(MockApi::new());
        let ids = WebhookIds::new("app1", "hook1").unwrap();
        let sinks = Arc::new(SinkLog::new());
        let ctl = DiffCommitController::new(
            Collaborators::new(api.clone(), sinks.clone(), sinks),
            ids,
            FieldSelector::new(&[WebhookField::BaseUrl]),
            Entity::new(),
            live.token(),
        );
        let mut edited = Entity::new();
        edited.set(WebhookField::Format, "json").unwrap();
        let patch = compute_diff(ctl.original(), &edited, IDENTITY_FIELDS);
        assert_eq!(ctl.commit(&patch).await.unwrap_err(), CommitError::ExcludedField(WebhookField::Format));
        assert!(api.calls().is_empty());
    }
}
