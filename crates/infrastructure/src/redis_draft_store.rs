//! Redis-backed draft store.

use async_trait::async_trait;
use authsim_application::DraftStore;
use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::RoleDraft;
use redis::AsyncCommands;

/// Redis implementation of the draft store port, one JSON value per scope.
#[derive(Clone)]
pub struct RedisDraftStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisDraftStore {
    /// Creates a store adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, scope: &SessionScope) -> String {
        format!("{}:{}", self.key_prefix, scope.storage_key())
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                AppError::Persistence(format!("failed to connect to redis: {error}"))
            })
    }
}

#[async_trait]
impl DraftStore for RedisDraftStore {
    async fn load_draft(&self, scope: &SessionScope) -> AppResult<Option<RoleDraft>> {
        let key = self.key_for(scope);
        let mut connection = self.connection().await?;

        let encoded: Option<String> = connection.get(&key).await.map_err(|error| {
            AppError::Persistence(format!("failed to read draft '{key}': {error}"))
        })?;

        encoded
            .as_deref()
            .map(|encoded| {
                serde_json::from_str(encoded).map_err(|error| {
                    AppError::Persistence(format!("draft '{key}' is corrupted: {error}"))
                })
            })
            .transpose()
    }

    async fn save_draft(&self, scope: &SessionScope, draft: &RoleDraft) -> AppResult<()> {
        let key = self.key_for(scope);
        let encoded = serde_json::to_string(draft).map_err(|error| {
            AppError::Persistence(format!("failed to serialize draft: {error}"))
        })?;
        let mut connection = self.connection().await?;

        connection
            .set::<_, _, ()>(&key, encoded)
            .await
            .map_err(|error| {
                AppError::Persistence(format!("failed to write draft '{key}': {error}"))
            })
    }

    async fn clear_draft(&self, scope: &SessionScope) -> AppResult<()> {
        let key = self.key_for(scope);
        let mut connection = self.connection().await?;

        connection
            .del::<_, ()>(&key)
            .await
            .map_err(|error| {
                AppError::Persistence(format!("failed to delete draft '{key}': {error}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use authsim_core::SessionScope;

    use super::RedisDraftStore;

    #[test]
    fn keys_are_prefixed_per_scope() {
        let client = redis::Client::open("redis://127.0.0.1:6379");
        assert!(client.is_ok());
        let store = RedisDraftStore::new(
            client.unwrap_or_else(|_| unreachable!()),
            "authsim:drafts",
        );
        let scope = SessionScope::new("100", "S4H").unwrap_or_else(|_| unreachable!());

        assert_eq!(
            store.key_for(&scope),
            "authsim:drafts:all_edited_roles_100_S4H"
        );
    }
}
