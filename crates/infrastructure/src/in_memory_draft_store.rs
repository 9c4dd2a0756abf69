use std::collections::HashMap;

use async_trait::async_trait;
use authsim_application::DraftStore;
use authsim_core::{AppResult, SessionScope};
use authsim_domain::RoleDraft;
use tokio::sync::RwLock;

/// In-memory draft store adapter.
#[derive(Default)]
pub struct InMemoryDraftStore {
    drafts: RwLock<HashMap<SessionScope, RoleDraft>>,
}

impl InMemoryDraftStore {
    /// Creates an empty in-memory draft store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn load_draft(&self, scope: &SessionScope) -> AppResult<Option<RoleDraft>> {
        Ok(self.drafts.read().await.get(scope).cloned())
    }

    async fn save_draft(&self, scope: &SessionScope, draft: &RoleDraft) -> AppResult<()> {
        self.drafts
            .write()
            .await
            .insert(scope.clone(), draft.clone());
        Ok(())
    }

    async fn clear_draft(&self, scope: &SessionScope) -> AppResult<()> {
        self.drafts.write().await.remove(scope);
        Ok(())
    }
}
