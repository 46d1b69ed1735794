#![forbid(unsafe_code)]

use hookedit_api::ApiError;
use hookedit_core::WebhookField;

/// Remote read failed. Stored by the loader and re-surfaced on every render.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fetch webhook: {0}")]
pub struct FetchError(#[from] pub ApiError);

impl FetchError {
    pub fn api_error(&self) -> &ApiError {
        &self.0
    }

    pub fn is_not_found(&self) -> bool {
        self.0.is_not_found()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("update webhook: {0}")]
    Update(ApiError),
    #[error("delete webhook: {0}")]
    Delete(ApiError),
    /// Rejected locally; nothing was sent.
    #[error("another update or delete is already in flight")]
    Busy,
    /// Patch touches identity or an untracked field; nothing was sent.
    #[error("patch must not carry field {0}")]
    ExcludedField(WebhookField),
}

/// What the error boundary of an edit view receives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error("webhook is still loading")]
    NotReady,
    #[error("edit session has ended; remount to continue")]
    Terminated,
}
