use authsim_core::{AppError, AppResult};
use authsim_domain::{
    AddSuggestion, DynamicOption, Role, RoleInput, ServerAuthObject, SimulationChange,
    SimulationRun, SimulationRunStatus,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use authsim_application::SubmittedRun;

/// JSON scalar the backend sends either as text or as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Number(value) => value.to_string(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(value) => value.trim().parse::<f64>().ok(),
            Self::Number(value) => value.as_f64(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(values) => values,
            Self::One(value) => vec![value],
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RoleDetailsDto {
    id: String,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    classification: Option<String>,
    #[serde(rename = "assignedUsers", default)]
    assigned_users: Option<u32>,
    #[serde(default)]
    gb: Option<u32>,
    #[serde(default)]
    gc: Option<u32>,
    #[serde(default)]
    gd: Option<u32>,
    #[serde(default)]
    not_classified: Option<u32>,
}

impl RoleDetailsDto {
    pub(super) fn into_role(self) -> AppResult<Role> {
        Role::new(RoleInput {
            id: self.id,
            description: self.description.unwrap_or_default(),
            classification: self.classification.unwrap_or_default(),
            profile: self.profile.filter(|profile| !profile.trim().is_empty()),
            gb: self.gb.unwrap_or_default(),
            gc: self.gc.unwrap_or_default(),
            gd: self.gd.unwrap_or_default(),
            not_classified: self.not_classified.unwrap_or_default(),
            assigned_users: self.assigned_users.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RoleObjectsDto {
    #[serde(rename = "objectDetails", default)]
    object_details: Vec<RoleObjectDto>,
}

impl RoleObjectsDto {
    pub(super) fn into_server_objects(self) -> Vec<ServerAuthObject> {
        self.object_details
            .into_iter()
            .map(RoleObjectDto::into_server_object)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RoleObjectDto {
    object: String,
    #[serde(default)]
    classification: Option<String>,
    #[serde(rename = "fieldName")]
    field_name: String,
    #[serde(rename = "valueLow", default)]
    value_low: Option<String>,
    #[serde(rename = "valueHigh", default)]
    value_high: Option<String>,
    #[serde(default)]
    ttext: Option<String>,
}

impl RoleObjectDto {
    fn into_server_object(self) -> ServerAuthObject {
        ServerAuthObject {
            object: self.object,
            classification: self.classification.unwrap_or_default(),
            field_name: self.field_name,
            value_low: self.value_low.unwrap_or_default(),
            value_high: self.value_high.unwrap_or_default(),
            ttext: self.ttext,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct FieldLicenseDto {
    #[serde(rename = "UI_TEXT", default)]
    ui_text: Option<String>,
}

/// Keeps the rows carrying a display text, in backend order.
pub(super) fn dynamic_options(rows: Vec<FieldLicenseDto>) -> Vec<DynamicOption> {
    rows.into_iter()
        .filter_map(|row| row.ui_text)
        .filter(|ui_text| !ui_text.trim().is_empty())
        .map(DynamicOption::from_ui_text)
        .collect()
}

#[derive(Debug, Deserialize)]
pub(super) struct AddSuggestionDto {
    value: String,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    ui_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl From<AddSuggestionDto> for AddSuggestion {
    fn from(value: AddSuggestionDto) -> Self {
        Self {
            value: value.value,
            license: value.license.unwrap_or_default(),
            ui_text: value.ui_text.unwrap_or_default(),
            text: value.text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SubmitResponseDto {
    simulation_run_id: Scalar,
    status: String,
    timestamp: String,
}

impl SubmitResponseDto {
    pub(super) fn into_submitted_run(self) -> AppResult<SubmittedRun> {
        Ok(SubmittedRun {
            simulation_run_id: self.simulation_run_id.into_text(),
            status: SimulationRunStatus::parse(self.status.as_str())?,
            timestamp: parse_timestamp(self.timestamp.as_str())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SimulationResultsDto {
    #[serde(default)]
    results: Option<OneOrMany<SimulationRunDto>>,
}

impl SimulationResultsDto {
    pub(super) fn into_runs(self) -> Vec<SimulationRunDto> {
        self.results.map(OneOrMany::into_vec).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SimulationRunDto {
    simulation_run_id: Scalar,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    fue_required: Option<Scalar>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    changes: Vec<SimulationChangeDto>,
}

impl SimulationRunDto {
    pub(super) fn run_id(&self) -> String {
        self.simulation_run_id.clone().into_text()
    }

    /// Converts one listed run; a missing status means the run completed.
    pub(super) fn into_run(self) -> AppResult<SimulationRun> {
        let status = match self.status.as_deref() {
            Some(status) => SimulationRunStatus::parse(status)?,
            None => SimulationRunStatus::Completed,
        };
        let timestamp = self
            .timestamp
            .as_deref()
            .ok_or_else(|| AppError::Validation("simulation run has no timestamp".to_owned()))
            .and_then(parse_timestamp)?;

        Ok(SimulationRun {
            simulation_run_id: self.simulation_run_id.into_text(),
            status,
            timestamp,
            fue_required: self.fue_required.as_ref().and_then(Scalar::as_f64),
            changes: self
                .changes
                .into_iter()
                .map(SimulationChangeDto::into_change)
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SimulationChangeDto {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    object: String,
    #[serde(default)]
    field: String,
    #[serde(default)]
    value_low: Option<String>,
    #[serde(default)]
    value_high: Option<String>,
    #[serde(default)]
    operation: String,
    #[serde(default)]
    prev_license: Option<String>,
    #[serde(default)]
    current_license: Option<String>,
}

impl SimulationChangeDto {
    fn into_change(self) -> SimulationChange {
        SimulationChange {
            id: self.id,
            role: self.role,
            object: self.object,
            field: self.field,
            value_low: self.value_low.unwrap_or_default(),
            value_high: self.value_high.unwrap_or_default(),
            operation: self.operation,
            prev_license: self.prev_license,
            current_license: self.current_license,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LicensePivotDto {
    fue_summary: FueSummaryDto,
}

#[derive(Debug, Deserialize)]
struct FueSummaryDto {
    #[serde(rename = "Total FUE Required", default)]
    total_fue_required: Option<Scalar>,
}

impl LicensePivotDto {
    pub(super) fn total_fue_required(&self) -> AppResult<f64> {
        self.fue_summary
            .total_fue_required
            .as_ref()
            .and_then(Scalar::as_f64)
            .ok_or_else(|| {
                AppError::Transport("license summary has no 'Total FUE Required' value".to_owned())
            })
    }
}

/// Parses RFC 3339 or `YYYY-MM-DD HH:MM:SS` timestamps; naive values are UTC.
pub(super) fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|timestamp| timestamp.and_utc())
        .ok_or_else(|| AppError::Validation(format!("invalid timestamp '{value}'")))
}

/// Extracts the backend's `detail` message from an error body.
pub(super) fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned());

    match detail {
        Some(serde_json::Value::String(detail)) => detail,
        Some(detail) => detail.to_string(),
        None if body.trim().is_empty() => "no details provided".to_owned(),
        None => body.trim().to_owned(),
    }
}
