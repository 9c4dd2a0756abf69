use async_trait::async_trait;
use authsim_core::{AppResult, SessionScope};
use authsim_domain::{AddSuggestion, DynamicOption, Role, ServerAuthObject};

/// Read port for roles, their authorization objects and candidate values.
#[async_trait]
pub trait AuthObjectCatalog: Send + Sync {
    /// Lists roles available for simulation.
    async fn list_roles(&self, scope: &SessionScope) -> AppResult<Vec<Role>>;

    /// Returns the authoritative authorization-object rows of one role.
    async fn fetch_role_objects(
        &self,
        scope: &SessionScope,
        role_id: &str,
    ) -> AppResult<Vec<ServerAuthObject>>;

    /// Returns candidate replacement values for a `Change` action.
    async fn fetch_dynamic_options(
        &self,
        scope: &SessionScope,
        object: &str,
        field_name: &str,
    ) -> AppResult<Vec<DynamicOption>>;

    /// Returns candidate values for an `Add` action.
    async fn fetch_add_suggestions(
        &self,
        scope: &SessionScope,
        object: &str,
        field_name: &str,
    ) -> AppResult<Vec<AddSuggestion>>;
}
