use authsim_domain::DynamicOption;

use super::*;

/// Kind of candidate values fetched for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsKind {
    /// Replacement values for `Change`.
    DynamicOptions,
    /// Values for `Add` on a new row.
    AddSuggestions,
}

impl OptionsKind {
    fn for_row(row: &AuthObjectChange) -> Option<Self> {
        match row.action {
            Some(ObjectAction::Change) if !row.is_new => Some(Self::DynamicOptions),
            Some(ObjectAction::Add) if row.is_new => Some(Self::AddSuggestions),
            _ => None,
        }
    }

    fn expected_action(self) -> ObjectAction {
        match self {
            Self::DynamicOptions => ObjectAction::Change,
            Self::AddSuggestions => ObjectAction::Add,
        }
    }
}

/// One issued candidate-value fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsRequest {
    /// Role owning the row.
    pub role_id: String,
    /// Row identifier.
    pub object_id: u64,
    /// Authorization object queried.
    pub object: String,
    /// Authorization field queried.
    pub field_name: String,
    /// Kind of values requested.
    pub kind: OptionsKind,
}

/// Whether recording an action started a candidate-value fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsFetch {
    /// A background fetch was started.
    Issued(OptionsRequest),
    /// The action has no candidate values.
    NotRequired,
    /// The row lacks object or field name, so nothing can be queried.
    MissingObjectOrField,
}

#[derive(Debug)]
enum OptionsPayload {
    Dynamic(Vec<DynamicOption>),
    Add(Vec<AddSuggestion>),
}

/// Completed candidate-value fetch, waiting to be applied.
#[derive(Debug)]
pub struct OptionsOutcome {
    request: OptionsRequest,
    result: AppResult<OptionsPayload>,
}

/// What applying a fetch outcome did to the draft.
#[derive(Debug)]
pub enum OptionsApplied {
    /// Candidate values were stored on the row.
    Applied(OptionsRequest),
    /// The row changed action, object or field, or was reset, before the values arrived.
    Stale(OptionsRequest),
    /// The fetch failed; the row keeps its action without candidate values.
    Failed {
        /// Failed request, eligible for an explicit retry.
        request: OptionsRequest,
        /// Fetch error.
        error: AppError,
    },
}

impl ChangeSetManager {
    /// Waits for the next candidate-value fetch to finish and applies it.
    pub async fn next_options_outcome(&mut self) -> AppResult<OptionsApplied> {
        let outcome = self.options_receiver.recv().await.ok_or_else(|| {
            AppError::Internal("candidate value channel closed unexpectedly".to_owned())
        })?;
        self.apply_options_outcome(outcome).await
    }

    /// Applies every candidate-value fetch that already finished.
    pub async fn drain_options_outcomes(&mut self) -> AppResult<Vec<OptionsApplied>> {
        let mut applied = Vec::new();
        while let Ok(outcome) = self.options_receiver.try_recv() {
            applied.push(self.apply_options_outcome(outcome).await?);
        }
        Ok(applied)
    }

    /// Stores the fetched candidate values on the drafted row.
    pub async fn apply_options_outcome(
        &mut self,
        outcome: OptionsOutcome,
    ) -> AppResult<OptionsApplied> {
        let OptionsOutcome { request, result } = outcome;

        let payload = match result {
            Ok(payload) => payload,
            Err(error) => {
                warn!(
                    scope = %self.scope,
                    role_id = %request.role_id,
                    object = %request.object,
                    field_name = %request.field_name,
                    error = %error,
                    "candidate value fetch failed"
                );
                return Ok(OptionsApplied::Failed { request, error });
            }
        };

        let mut next = self.draft.clone();
        let Some(row) = next
            .rows_mut(request.role_id.as_str())
            .and_then(|rows| rows.iter_mut().find(|row| row.id == request.object_id))
            .filter(|row| {
                row.action == Some(request.kind.expected_action())
                    && row.object == request.object
                    && row.field_name == request.field_name
            })
        else {
            debug!(
                scope = %self.scope,
                role_id = %request.role_id,
                object_id = request.object_id,
                "discarding candidate values for a row that changed"
            );
            return Ok(OptionsApplied::Stale(request));
        };

        match payload {
            OptionsPayload::Dynamic(options) => row.dynamic_options = Some(options),
            OptionsPayload::Add(suggestions) => {
                if row.value_low.is_empty()
                    && let Some(first) = suggestions.first()
                {
                    row.apply_add_suggestion(first);
                }
                row.add_suggestions = Some(suggestions);
            }
        }

        self.persist(next).await?;
        Ok(OptionsApplied::Applied(request))
    }

    pub(super) fn issue_options_fetch(
        &self,
        role_id: &str,
        row: &AuthObjectChange,
    ) -> OptionsFetch {
        let Some(kind) = OptionsKind::for_row(row) else {
            return OptionsFetch::NotRequired;
        };
        if !row.has_object_and_field() {
            return OptionsFetch::MissingObjectOrField;
        }

        let request = OptionsRequest {
            role_id: role_id.to_owned(),
            object_id: row.id,
            object: row.object.clone(),
            field_name: row.field_name.clone(),
            kind,
        };

        let catalog = Arc::clone(&self.catalog);
        let scope = self.scope.clone();
        let sender = self.options_sender.clone();
        let task_request = request.clone();
        tokio::spawn(async move {
            let object = task_request.object.as_str();
            let field_name = task_request.field_name.as_str();
            let result = match task_request.kind {
                OptionsKind::DynamicOptions => catalog
                    .fetch_dynamic_options(&scope, object, field_name)
                    .await
                    .map(OptionsPayload::Dynamic),
                OptionsKind::AddSuggestions => catalog
                    .fetch_add_suggestions(&scope, object, field_name)
                    .await
                    .map(OptionsPayload::Add),
            };

            if sender
                .send(OptionsOutcome {
                    request: task_request,
                    result,
                })
                .is_err()
            {
                debug!("change-set manager dropped before candidate values arrived");
            }
        });

        OptionsFetch::Issued(request)
    }
}
