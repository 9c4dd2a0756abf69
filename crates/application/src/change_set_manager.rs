use std::collections::HashMap;
use std::sync::Arc;

use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::{
    AddSuggestion, AuthObjectChange, ChangeSet, ChangeSetRejected, ObjectAction, ObjectField,
    Role, RoleDraft, merge_rows,
};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::simulation_ports::{AuthObjectCatalog, DraftStore};

mod options;

pub use options::{OptionsApplied, OptionsFetch, OptionsKind, OptionsOutcome, OptionsRequest};

/// Result of recording an action on one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecorded {
    /// Row as persisted after the action was set.
    pub row: AuthObjectChange,
    /// Candidate-value fetch issued for the new action.
    pub options_fetch: OptionsFetch,
}

/// Owner of the unsaved role drafts of one `(client, system)` session.
pub struct ChangeSetManager {
    scope: SessionScope,
    catalog: Arc<dyn AuthObjectCatalog>,
    store: Arc<dyn DraftStore>,
    draft: RoleDraft,
    snapshots: HashMap<String, Vec<AuthObjectChange>>,
    selected_role_id: Option<String>,
    next_row_id: u64,
    options_sender: mpsc::UnboundedSender<OptionsOutcome>,
    options_receiver: mpsc::UnboundedReceiver<OptionsOutcome>,
}

impl ChangeSetManager {
    /// Opens the session, restoring any persisted draft.
    ///
    /// A draft that cannot be read is discarded and the session starts empty.
    pub async fn open(
        scope: SessionScope,
        catalog: Arc<dyn AuthObjectCatalog>,
        store: Arc<dyn DraftStore>,
    ) -> Self {
        let draft = match store.load_draft(&scope).await {
            Ok(Some(draft)) => draft,
            Ok(None) => RoleDraft::new(),
            Err(error) => {
                warn!(scope = %scope, error = %error, "discarding unreadable draft");
                if let Err(clear_error) = store.clear_draft(&scope).await {
                    warn!(
                        scope = %scope,
                        error = %clear_error,
                        "failed to clear unreadable draft"
                    );
                }
                RoleDraft::new()
            }
        };

        let now_millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let next_row_id = draft
            .max_row_id()
            .map_or(now_millis, |max_id| now_millis.max(max_id.saturating_add(1)));
        let (options_sender, options_receiver) = mpsc::unbounded_channel();

        debug!(
            scope = %scope,
            drafted_roles = draft.iter().count(),
            "change-set manager opened"
        );

        Self {
            scope,
            catalog,
            store,
            draft,
            snapshots: HashMap::new(),
            selected_role_id: None,
            next_row_id,
            options_sender,
            options_receiver,
        }
    }

    /// Returns the session scope.
    #[must_use]
    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    /// Returns the current draft.
    #[must_use]
    pub fn draft(&self) -> &RoleDraft {
        &self.draft
    }

    /// Returns the currently selected role.
    #[must_use]
    pub fn selected_role_id(&self) -> Option<&str> {
        self.selected_role_id.as_deref()
    }

    /// Returns the ids of roles holding pending edits.
    #[must_use]
    pub fn pending_role_ids(&self) -> Vec<&str> {
        self.draft.pending_role_ids()
    }

    /// Returns true when any role holds a pending edit.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.draft.pending_role_ids().is_empty()
    }

    /// Fetches the role's server rows and loads them.
    pub async fn fetch_role(&mut self, role: &Role) -> AppResult<Vec<AuthObjectChange>> {
        let server_objects = self
            .catalog
            .fetch_role_objects(&self.scope, role.id())
            .await?;
        let server_rows = server_objects
            .into_iter()
            .zip(1_u64..)
            .map(|(source, id)| AuthObjectChange::from_server(id, source))
            .collect();

        Ok(self.load_role(role, server_rows))
    }

    /// Selects a role and merges its server rows with the drafted ones.
    pub fn load_role(
        &mut self,
        role: &Role,
        server_rows: Vec<AuthObjectChange>,
    ) -> Vec<AuthObjectChange> {
        let role_id = role.id().to_owned();
        let merged = merge_rows(&server_rows, self.draft.rows(role_id.as_str()));

        debug!(
            scope = %self.scope,
            role_id = %role_id,
            server_rows = server_rows.len(),
            display_rows = merged.len(),
            "role loaded"
        );

        self.snapshots.insert(role_id.clone(), server_rows);
        self.selected_role_id = Some(role_id);
        merged
    }

    /// Returns the display rows of the selected role.
    pub fn rows(&self) -> AppResult<Vec<AuthObjectChange>> {
        let role_id = self.require_selected_role()?;
        Ok(self.display_rows(role_id))
    }

    /// Sets or clears the action of one row of the selected role.
    ///
    /// `Change` on a server row and `Add` on a new row issue a background fetch
    /// of candidate values; its outcome never rolls the action back.
    pub async fn record_action(
        &mut self,
        object_id: u64,
        action: Option<ObjectAction>,
    ) -> AppResult<ActionRecorded> {
        let row = self
            .mutate_selected_row(object_id, |row| row.set_action(action))
            .await?;
        let role_id = self.require_selected_role()?.to_owned();
        let options_fetch = self.issue_options_fetch(role_id.as_str(), &row);

        Ok(ActionRecorded { row, options_fetch })
    }

    /// Re-issues the candidate-value fetch for the row's current action.
    pub fn retry_options(&mut self, object_id: u64) -> AppResult<OptionsFetch> {
        let role_id = self.require_selected_role()?.to_owned();
        let row = self
            .display_rows(role_id.as_str())
            .into_iter()
            .find(|row| row.id == object_id)
            .ok_or_else(|| row_not_found(role_id.as_str(), object_id))?;

        Ok(self.issue_options_fetch(role_id.as_str(), &row))
    }

    /// Sets one editable column of a row.
    pub async fn update_value(
        &mut self,
        object_id: u64,
        field: ObjectField,
        value: impl Into<String>,
    ) -> AppResult<AuthObjectChange> {
        let value = value.into();
        self.mutate_selected_row(object_id, |row| {
            row.set_field(field, value);
            Ok(())
        })
        .await
    }

    /// Sets the replacement text of a row.
    pub async fn update_new_value(
        &mut self,
        object_id: u64,
        value: impl Into<String>,
    ) -> AppResult<AuthObjectChange> {
        let value = value.into();
        self.mutate_selected_row(object_id, |row| {
            row.set_new_value(value);
            Ok(())
        })
        .await
    }

    /// Applies one add suggestion to a row.
    pub async fn select_add_suggestion(
        &mut self,
        object_id: u64,
        suggestion: &AddSuggestion,
    ) -> AppResult<AuthObjectChange> {
        self.mutate_selected_row(object_id, |row| {
            row.apply_add_suggestion(suggestion);
            Ok(())
        })
        .await
    }

    /// Appends an empty `Add` row to the selected role and returns its id.
    pub async fn add_row(&mut self) -> AppResult<u64> {
        let role_id = self.require_selected_role()?.to_owned();
        let id = self.next_row_id;

        let mut rows = self.display_rows(role_id.as_str());
        rows.push(AuthObjectChange::new_row(id));
        let mut next = self.draft.clone();
        next.set_rows(role_id.as_str(), rows);
        self.persist(next).await?;

        self.next_row_id = id.saturating_add(1);
        Ok(id)
    }

    /// Discards the role's draft and returns its last-loaded server rows.
    pub async fn reset(&mut self, role_id: &str) -> AppResult<Vec<AuthObjectChange>> {
        let mut next = self.draft.clone();
        if next.remove(role_id) {
            self.persist(next).await?;
            info!(scope = %self.scope, role_id = %role_id, "role draft reset");
        }

        Ok(self.snapshots.get(role_id).cloned().unwrap_or_default())
    }

    /// Flattens every role's pending edits into one validated change-set.
    pub fn build_change_set(&self) -> Result<ChangeSet, ChangeSetRejected> {
        ChangeSet::from_draft(&self.draft)
    }

    /// Wipes the persisted draft of the session.
    pub async fn clear_all(&mut self) -> AppResult<()> {
        self.store.clear_draft(&self.scope).await?;
        self.draft = RoleDraft::new();
        info!(scope = %self.scope, "session draft cleared");
        Ok(())
    }

    fn require_selected_role(&self) -> AppResult<&str> {
        self.selected_role_id
            .as_deref()
            .ok_or_else(|| AppError::Conflict("no role is selected".to_owned()))
    }

    fn display_rows(&self, role_id: &str) -> Vec<AuthObjectChange> {
        let snapshot = self
            .snapshots
            .get(role_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        merge_rows(snapshot, self.draft.rows(role_id))
    }

    async fn mutate_selected_row<F>(
        &mut self,
        object_id: u64,
        mutate: F,
    ) -> AppResult<AuthObjectChange>
    where
        F: FnOnce(&mut AuthObjectChange) -> AppResult<()>,
    {
        let role_id = self.require_selected_role()?.to_owned();
        let mut rows = self.display_rows(role_id.as_str());
        let row = rows
            .iter_mut()
            .find(|row| row.id == object_id)
            .ok_or_else(|| row_not_found(role_id.as_str(), object_id))?;
        mutate(row)?;
        let updated = row.clone();

        let mut next = self.draft.clone();
        next.set_rows(role_id.as_str(), rows);
        self.persist(next).await?;
        Ok(updated)
    }

    async fn persist(&mut self, next: RoleDraft) -> AppResult<()> {
        self.store.save_draft(&self.scope, &next).await?;
        self.draft = next;
        Ok(())
    }
}

fn row_not_found(role_id: &str, object_id: u64) -> AppError {
    AppError::NotFound(format!("row {object_id} not found for role '{role_id}'"))
}
