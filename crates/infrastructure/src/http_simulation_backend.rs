//! HTTP adapter for the simulation backend.

use async_trait::async_trait;
use authsim_application::{AuthObjectCatalog, SimulationGateway, SubmittedRun};
use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::{
    AddSuggestion, ChangeSet, DynamicOption, Role, ServerAuthObject, SimulationRun,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

mod dto;

use dto::{
    AddSuggestionDto, FieldLicenseDto, LicensePivotDto, RoleDetailsDto, RoleObjectsDto,
    SimulationResultsDto, SubmitResponseDto, dynamic_options, error_detail,
};

/// Backend client implementing the catalog and gateway ports over HTTP.
#[derive(Clone)]
pub struct HttpSimulationBackend {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpSimulationBackend {
    /// Creates a backend client rooted at `base_url`.
    pub fn new(http_client: reqwest::Client, base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            AppError::Validation(format!("invalid backend base URL '{base_url}': {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "backend base URL '{base_url}' cannot carry paths"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "backend base URL '{}' cannot carry paths",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T>(
        &self,
        operation: &str,
        url: Url,
        query: &[(&str, &str)],
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|error| transport_error(operation, &error))?;
        decode_response(operation, response).await
    }

    async fn send_post(
        &self,
        operation: &str,
        url: Url,
        scope: &SessionScope,
        body: Option<&ChangeSet>,
    ) -> AppResult<reqwest::Response> {
        let mut builder = self.http_client.post(url).query(&scope_query(scope));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| transport_error(operation, &error))?;
        ensure_success(operation, response).await
    }
}

#[async_trait]
impl AuthObjectCatalog for HttpSimulationBackend {
    async fn list_roles(&self, scope: &SessionScope) -> AppResult<Vec<Role>> {
        let url = self.endpoint(&["simulator", "roles_for_sim", "details", ""])?;
        let roles: Vec<RoleDetailsDto> = self
            .get_json("list roles", url, &scope_query(scope))
            .await?;

        Ok(roles
            .into_iter()
            .filter_map(|role| match role.into_role() {
                Ok(role) => Some(role),
                Err(error) => {
                    warn!(scope = %scope, error = %error, "skipping invalid role");
                    None
                }
            })
            .collect())
    }

    async fn fetch_role_objects(
        &self,
        scope: &SessionScope,
        role_id: &str,
    ) -> AppResult<Vec<ServerAuthObject>> {
        let url = self.endpoint(&["simulator", "role-details-for-simulation", role_id])?;
        let details: RoleObjectsDto = self
            .get_json("fetch role objects", url, &scope_query(scope))
            .await?;
        Ok(details.into_server_objects())
    }

    async fn fetch_dynamic_options(
        &self,
        scope: &SessionScope,
        object: &str,
        field_name: &str,
    ) -> AppResult<Vec<DynamicOption>> {
        let url = self.endpoint(&["simulator", "auth_object_field_license_data", ""])?;
        let rows: Vec<FieldLicenseDto> = self
            .get_json(
                "fetch dynamic options",
                url,
                &object_query(scope, object, field_name),
            )
            .await?;
        Ok(dynamic_options(rows))
    }

    async fn fetch_add_suggestions(
        &self,
        scope: &SessionScope,
        object: &str,
        field_name: &str,
    ) -> AppResult<Vec<AddSuggestion>> {
        let url = self.endpoint(&["simulator", "get-add-suggestions", ""])?;
        let suggestions: Vec<AddSuggestionDto> = self
            .get_json(
                "fetch add suggestions",
                url,
                &object_query(scope, object, field_name),
            )
            .await?;
        Ok(suggestions.into_iter().map(AddSuggestion::from).collect())
    }
}

#[async_trait]
impl SimulationGateway for HttpSimulationBackend {
    async fn submit_change_set(
        &self,
        scope: &SessionScope,
        change_set: &ChangeSet,
    ) -> AppResult<SubmittedRun> {
        let operation = "submit change-set";
        let url = self.endpoint(&["simulator", "apply-simulation-changes", ""])?;
        debug!(scope = %scope, entries = change_set.len(), "posting change-set");

        let response = self
            .send_post(operation, url, scope, Some(change_set))
            .await?;
        let submitted: SubmitResponseDto = response
            .json()
            .await
            .map_err(|error| invalid_payload(operation, &error))?;
        submitted.into_submitted_run()
    }

    async fn trigger_simulation(&self, scope: &SessionScope) -> AppResult<()> {
        let url = self.endpoint(&["simulation_result", "run-simulation", ""])?;
        self.send_post("trigger simulation", url, scope, None).await?;
        Ok(())
    }

    async fn list_runs(&self, scope: &SessionScope) -> AppResult<Vec<SimulationRun>> {
        let url = self.endpoint(&["simulation_result", "simulation-results", ""])?;
        let listing: SimulationResultsDto = self
            .get_json("list simulation runs", url, &scope_query(scope))
            .await?;

        Ok(listing
            .into_runs()
            .into_iter()
            .filter_map(|run| {
                let run_id = run.run_id();
                match run.into_run() {
                    Ok(run) => Some(run),
                    Err(error) => {
                        warn!(
                            scope = %scope,
                            run_id = %run_id,
                            error = %error,
                            "skipping unreadable simulation run"
                        );
                        None
                    }
                }
            })
            .collect())
    }

    async fn fetch_actual_fue(&self, scope: &SessionScope) -> AppResult<f64> {
        let url = self.endpoint(&["data", "pivot-table", "license-classification", ""])?;
        let pivot: LicensePivotDto = self
            .get_json("fetch license summary", url, &scope_query(scope))
            .await?;
        pivot.total_fue_required()
    }
}

fn scope_query(scope: &SessionScope) -> [(&str, &str); 2] {
    [
        ("client_name", scope.client()),
        ("system_name", scope.system()),
    ]
}

fn object_query<'a>(
    scope: &'a SessionScope,
    object: &'a str,
    field_name: &'a str,
) -> [(&'static str, &'a str); 4] {
    [
        ("authorization_object", object),
        ("field", field_name),
        ("client_name", scope.client()),
        ("system_name", scope.system()),
    ]
}

async fn ensure_success(
    operation: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
    Err(AppError::Transport(format!(
        "{operation} failed with status {status}: {}",
        error_detail(body.as_str())
    )))
}

async fn decode_response<T>(operation: &str, response: reqwest::Response) -> AppResult<T>
where
    T: DeserializeOwned,
{
    ensure_success(operation, response)
        .await?
        .json::<T>()
        .await
        .map_err(|error| invalid_payload(operation, &error))
}

fn transport_error(operation: &str, error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        return AppError::Transport(format!("{operation} timed out: {error}"));
    }
    AppError::Transport(format!("{operation} request failed: {error}"))
}

fn invalid_payload(operation: &str, error: &reqwest::Error) -> AppError {
    AppError::Transport(format!("{operation} returned an invalid payload: {error}"))
}
