use authsim_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of one backend simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationRunStatus {
    /// Run accepted and queued.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Backend is applying the submitted change-set.
    #[serde(rename = "Processing Changes")]
    ProcessingChanges,
    /// Run finished successfully.
    Completed,
    /// Run finished with an error.
    Failed,
}

impl SimulationRunStatus {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::ProcessingChanges => "Processing Changes",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Parses a wire value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "In Progress" => Ok(Self::InProgress),
            "Processing Changes" => Ok(Self::ProcessingChanges),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown simulation run status '{value}'"
            ))),
        }
    }

    /// Returns true once the run can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One edit as recorded by the backend for a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationChange {
    /// Backend row identifier.
    pub id: Option<u64>,
    /// Role the edit applied to.
    pub role: String,
    /// Authorization object name.
    pub object: String,
    /// Authorization field name.
    pub field: String,
    /// Lower bound value.
    pub value_low: String,
    /// Upper bound value.
    pub value_high: String,
    /// Applied operation.
    pub operation: String,
    /// License of the role before the run.
    pub prev_license: Option<String>,
    /// License of the role after the run.
    pub current_license: Option<String>,
}

/// Backend simulation run as observed through polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    /// Backend run identifier.
    pub simulation_run_id: String,
    /// Current lifecycle status.
    pub status: SimulationRunStatus,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// FUE the simulated authorizations require, once computed.
    pub fue_required: Option<f64>,
    /// Edits recorded for the run.
    pub changes: Vec<SimulationChange>,
}

impl SimulationRun {
    /// Returns true while the run is still progressing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Sorts runs most recent first, run id breaking timestamp ties.
pub fn sort_runs_newest_first(runs: &mut [SimulationRun]) {
    runs.sort_by(|left, right| {
        right
            .timestamp
            .cmp(&left.timestamp)
            .then_with(|| right.simulation_run_id.cmp(&left.simulation_run_id))
    });
}

/// Returns true when any run is still progressing.
#[must_use]
pub fn has_active_run(runs: &[SimulationRun]) -> bool {
    runs.iter().any(SimulationRun::is_active)
}

/// Run listing row with FUE savings against the current productive FUE.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOverview {
    /// Backend run identifier.
    pub simulation_run_id: String,
    /// Current lifecycle status.
    pub status: SimulationRunStatus,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// FUE required by the simulated authorizations.
    pub simulation_fue: Option<f64>,
    /// FUE required by the productive authorizations.
    pub actual_fue: Option<f64>,
    /// `actual_fue - simulation_fue` when both are known.
    pub savings: Option<f64>,
}

impl RunOverview {
    /// Builds an overview row; savings stay unknown unless both figures are.
    #[must_use]
    pub fn new(run: &SimulationRun, actual_fue: Option<f64>) -> Self {
        Self {
            simulation_run_id: run.simulation_run_id.clone(),
            status: run.status,
            timestamp: run.timestamp,
            simulation_fue: run.fue_required,
            actual_fue,
            savings: actual_fue
                .zip(run.fue_required)
                .map(|(actual, simulated)| actual - simulated),
        }
    }
}
