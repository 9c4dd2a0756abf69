use async_trait::async_trait;
use authsim_core::{AppResult, SessionScope};
use authsim_domain::RoleDraft;

/// Persistence port for unsaved drafts, keyed by `(client, system)`.
///
/// Every write replaces the whole draft of the scope.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Loads the persisted draft, `None` when nothing was stored.
    async fn load_draft(&self, scope: &SessionScope) -> AppResult<Option<RoleDraft>>;

    /// Replaces the persisted draft.
    async fn save_draft(&self, scope: &SessionScope, draft: &RoleDraft) -> AppResult<()>;

    /// Removes the persisted draft.
    async fn clear_draft(&self, scope: &SessionScope) -> AppResult<()>;
}
