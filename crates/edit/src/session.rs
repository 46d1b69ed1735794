//! Per-view edit lifecycle.
//!
//! ```text
//! Loading ──> Error
//!    └──────> Ready ──> Submitting ──> Ready | Failed
//!               └────> Deleting ────> Navigated | Failed
//! ```
//!
//! `Loading` happens once per session. `Error` and `Failed` end the session:
//! [`EditSession::render`] keeps returning the error and further actions are
//! refused until the view is remounted. Dropping a submit or delete future
//! before it resolves leaves the session `Ready`.

#![forbid(unsafe_code)]

use std::sync::Arc;

use hookedit_core::{Entity, FieldSelector, Patch, Webhook, WebhookIds};
use tracing::{debug, info};

use crate::{
    project, Collaborators, CommitError, DiffCommitController, EditError, EntityLoader, LoadState, Liveness,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Error,
    Ready,
    Submitting,
    Deleting,
    Navigated,
    Failed,
}

/// What the view should draw right now.
#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    /// Spinner; no form until the fetch resolves.
    Loading,
    /// Form seeded with the fetched webhook.
    Form(&'a Webhook),
    /// The session navigated away to this path.
    Navigated(String),
}

/// Puts the phase back to `Ready` if an action future is dropped mid-flight.
/// Completed actions overwrite the phase right after the guard goes away.
struct RestoreReady<'a>(&'a mut Phase);

impl Drop for RestoreReady<'_> {
    fn drop(&mut self) {
        *self.0 = Phase::Ready;
    }
}

pub struct EditSession {
    ids: WebhookIds,
    selector: FieldSelector,
    deps: Collaborators,
    loader: EntityLoader,
    phase: Phase,
    original: Option<Arc<Webhook>>,
    controller: Option<Arc<DiffCommitController>>,
    failure: Option<EditError>,
    liveness: Liveness,
}

impl EditSession {
    /// Mount the view: start the single fetch for this session.
    pub fn mount(ids: WebhookIds, selector: FieldSelector, deps: Collaborators) -> Self {
        let mut loader = EntityLoader::new(deps.api.clone(), ids.clone(), selector);
        loader.mount();
        info!(webhook = %ids, edit_path = %ids.edit_path(), "session: mounted");
        Self {
            ids,
            selector,
            deps,
            loader,
            phase: Phase::Loading,
            original: None,
            controller: None,
            failure: None,
            liveness: Liveness::new(),
        }
    }

    /// Discard this session and start over with a fresh fetch.
    pub fn remount(self) -> Self {
        let (ids, selector, deps) = (self.ids.clone(), self.selector, self.deps.clone());
        drop(self);
        Self::mount(ids, selector, deps)
    }

    pub fn ids(&self) -> &WebhookIds {
        &self.ids
    }

    pub fn phase(&mut self) -> Phase {
        self.sync();
        self.phase
    }

    /// Controller for action handlers; `None` until the fetch succeeded.
    pub fn controller(&mut self) -> Option<Arc<DiffCommitController>> {
        self.sync();
        self.controller.clone()
    }

    /// Wait for the fetch, then render.
    pub async fn ready(&mut self) -> Result<View<'_>, EditError> {
        if self.phase == Phase::Loading {
            self.loader.settled().await;
        }
        self.render()
    }

    pub fn render(&mut self) -> Result<View<'_>, EditError> {
        self.sync();
        match self.phase {
            Phase::Loading => Ok(View::Loading),
            Phase::Ready | Phase::Submitting | Phase::Deleting => match &self.original {
                Some(w) => Ok(View::Form(w.as_ref())),
                None => Ok(View::Loading),
            },
            Phase::Navigated => Ok(View::Navigated(self.ids.list_path())),
            Phase::Error | Phase::Failed => Err(self.failure.clone().unwrap_or(EditError::Terminated)),
        }
    }

    /// Baseline entity the form edits, once loaded.
    pub fn original(&mut self) -> Option<Entity> {
        self.sync();
        self.controller.as_ref().map(|c| c.original().clone())
    }

    pub async fn submit(&mut self, edited: &Entity) -> Result<Patch, EditError> {
        let ctl = self.begin(Phase::Submitting)?;
        let result = {
            let _restore = RestoreReady(&mut self.phase);
            ctl.submit(edited).await
        };
        match result {
            Ok(patch) => {
                self.phase = Phase::Ready;
                Ok(patch)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn delete(&mut self) -> Result<(), EditError> {
        let ctl = self.begin(Phase::Deleting)?;
        let result = {
            let _restore = RestoreReady(&mut self.phase);
            ctl.delete().await
        };
        match result {
            Ok(()) => {
                self.phase = Phase::Navigated;
                self.original = None;
                self.controller = None;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn begin(&mut self, next: Phase) -> Result<Arc<DiffCommitController>, EditError> {
        self.sync();
        match self.phase {
            Phase::Ready => {}
            Phase::Loading => return Err(EditError::NotReady),
            Phase::Submitting | Phase::Deleting => return Err(CommitError::Busy.into()),
            Phase::Error | Phase::Failed | Phase::Navigated => return Err(EditError::Terminated),
        }
        let ctl = self.controller.clone().ok_or(EditError::NotReady)?;
        self.phase = next;
        Ok(ctl)
    }

    fn fail(&mut self, e: CommitError) -> EditError {
        let err = EditError::from(e);
        if matches!(err, EditError::Commit(CommitError::Busy)) {
            // Rejected before reaching the remote; the session is intact
            self.phase = Phase::Ready;
            return err;
        }
        self.phase = Phase::Failed;
        self.failure = Some(err.clone());
        err
    }

    /// Pull the loader's result into the phase machine.
    fn sync(&mut self) {
        if self.phase != Phase::Loading {
            return;
        }
        match self.loader.state() {
            LoadState::Loading => {}
            LoadState::Ready(webhook) => match project(&webhook, self.selector) {
                Ok(entity) => {
                    let ctl = DiffCommitController::new(
                        self.deps.clone(),
                        self.ids.clone(),
                        self.selector,
                        entity,
                        self.liveness.token(),
                    );
                    self.controller = Some(Arc::new(ctl));
                    self.original = Some(webhook);
                    self.phase = Phase::Ready;
                    debug!(webhook = %self.ids, "session: ready");
                }
                Err(e) => {
                    self.failure = Some(e.into());
                    self.phase = Phase::Error;
                }
            },
            LoadState::Failed(e) => {
                self.failure = Some(e.into());
                self.phase = Phase::Error;
            }
        }
    }
}
