//! hookedit edit session: fetch a webhook, diff the form's candidate against
//! the fetched baseline, commit the minimal patch or delete the webhook.
//!
//! - [`EntityLoader`] issues the single fetch of a session
//! - [`DiffCommitController`] owns the baseline and talks to the remote API
//! - [`EditSession`] ties both to the lifecycle and the error boundary

#![forbid(unsafe_code)]

mod controller;
mod error;
mod liveness;
mod loader;
mod session;
mod sinks;

pub use controller::DiffCommitController;
pub use error::{CommitError, EditError, FetchError};
pub use liveness::{Liveness, LivenessToken};
pub use loader::{project, EntityLoader, LoadState};
pub use session::{EditSession, Phase, View};
pub use sinks::{Navigator, Notifier, Severity, SinkEvent, SinkLog};

use std::sync::Arc;

use hookedit_api::WebhookApi;

pub const UPDATE_SUCCESS: &str = "Successfully updated webhook";
pub const DELETE_SUCCESS: &str = "Successfully deleted webhook";

/// Everything an edit session talks to, passed in explicitly.
#[derive(Clone)]
pub struct Collaborators {
    pub api: Arc<dyn WebhookApi>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

impl Collaborators {
    pub fn new(api: Arc<dyn WebhookApi>, notifier: Arc<dyn Notifier>, navigator: Arc<dyn Navigator>) -> Self {
        Self { api, notifier, navigator }
    }
}
