use async_trait::async_trait;
use authsim_core::{AppResult, SessionScope};
use authsim_domain::{ChangeSet, SimulationRun, SimulationRunStatus};
use chrono::{DateTime, Utc};

/// Run created by the backend for a submitted change-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedRun {
    /// Backend run identifier.
    pub simulation_run_id: String,
    /// Status reported at submission.
    pub status: SimulationRunStatus,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Port for submitting change-sets and observing simulation runs.
#[async_trait]
pub trait SimulationGateway: Send + Sync {
    /// Posts one change-set and returns the run the backend created.
    async fn submit_change_set(
        &self,
        scope: &SessionScope,
        change_set: &ChangeSet,
    ) -> AppResult<SubmittedRun>;

    /// Triggers one run of the backend simulation job.
    async fn trigger_simulation(&self, scope: &SessionScope) -> AppResult<()>;

    /// Lists simulation runs in backend order.
    async fn list_runs(&self, scope: &SessionScope) -> AppResult<Vec<SimulationRun>>;

    /// Returns the FUE required by the productive authorizations.
    async fn fetch_actual_fue(&self, scope: &SessionScope) -> AppResult<f64>;
}
