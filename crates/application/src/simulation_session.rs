use std::sync::Arc;

use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::{ChangeSummary, RunOverview, SimulationRun, SimulationRunStatus};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::change_set_manager::ChangeSetManager;
use crate::run_status_poller::{PollerConfig, PollerEvent, RunStatusPoller};
use crate::simulation_ports::{AuthObjectCatalog, DraftStore, SimulationGateway, SubmittedRun};

/// Acknowledgement of one accepted change-set submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Human-facing request number.
    pub request_number: String,
    /// Run created by the backend.
    pub run: SubmittedRun,
    /// Entry counts per action.
    pub summary: ChangeSummary,
}

/// One `(client, system)` simulation session: drafting, submission and run tracking.
pub struct SimulationSession {
    manager: ChangeSetManager,
    poller: RunStatusPoller,
    events: mpsc::UnboundedReceiver<PollerEvent>,
    gateway: Arc<dyn SimulationGateway>,
    submitted_run_id: Option<String>,
}

impl SimulationSession {
    /// Opens the session and restores its persisted draft.
    pub async fn open(
        scope: SessionScope,
        catalog: Arc<dyn AuthObjectCatalog>,
        gateway: Arc<dyn SimulationGateway>,
        store: Arc<dyn DraftStore>,
        config: PollerConfig,
    ) -> Self {
        let manager = ChangeSetManager::open(scope.clone(), catalog, store).await;
        let (poller, events) = RunStatusPoller::new(scope, Arc::clone(&gateway), config);

        Self {
            manager,
            poller,
            events,
            gateway,
            submitted_run_id: None,
        }
    }

    /// Returns the change-set manager.
    #[must_use]
    pub fn manager(&self) -> &ChangeSetManager {
        &self.manager
    }

    /// Returns the change-set manager for edits.
    pub fn manager_mut(&mut self) -> &mut ChangeSetManager {
        &mut self.manager
    }

    /// Returns the run status poller.
    #[must_use]
    pub fn poller(&self) -> &RunStatusPoller {
        &self.poller
    }

    /// Validates every pending edit and submits them as one change-set.
    pub async fn run_simulation(&mut self) -> AppResult<SubmissionReceipt> {
        let change_set = self.manager.build_change_set()?;
        if change_set.is_empty() {
            return Err(AppError::Validation(
                "no pending changes to simulate".to_owned(),
            ));
        }

        let summary = change_set.summary();
        let run = self.poller.submit(&change_set).await?;
        let request_number = request_number(Utc::now().timestamp_millis());
        self.submitted_run_id = Some(run.simulation_run_id.clone());

        info!(
            scope = %self.manager.scope(),
            run_id = %run.simulation_run_id,
            request_number = %request_number,
            summary = %summary,
            "simulation requested"
        );

        Ok(SubmissionReceipt {
            request_number,
            run,
            summary,
        })
    }

    /// Follows poller events until the submitted run finishes.
    ///
    /// A completed run clears the session draft. A failed run keeps it for
    /// another attempt.
    pub async fn await_outcome(&mut self) -> AppResult<SimulationRun> {
        let run_id = self.submitted_run_id.clone().ok_or_else(|| {
            AppError::Conflict("no simulation run was submitted in this session".to_owned())
        })?;

        loop {
            let event = self.events.recv().await.ok_or_else(|| {
                AppError::Internal("run status event channel closed unexpectedly".to_owned())
            })?;

            match event {
                PollerEvent::RunsUpdated(_) => {}
                PollerEvent::RunFinished(run) if run.simulation_run_id == run_id => {
                    self.submitted_run_id = None;
                    if run.status == SimulationRunStatus::Completed {
                        self.manager.clear_all().await?;
                    }
                    return Ok(run);
                }
                PollerEvent::RunFinished(_) => {}
                PollerEvent::PollingDegraded {
                    consecutive_failures,
                } => {
                    return Err(AppError::PollingDegraded {
                        consecutive_failures,
                    });
                }
            }
        }
    }

    /// Lists runs with FUE savings, newest first.
    ///
    /// Savings stay unknown when the productive FUE cannot be fetched.
    pub async fn run_overviews(&self) -> AppResult<Vec<RunOverview>> {
        let runs = self.poller.refresh().await?;
        let actual_fue = match self.gateway.fetch_actual_fue(self.manager.scope()).await {
            Ok(actual_fue) => Some(actual_fue),
            Err(error) => {
                warn!(
                    scope = %self.manager.scope(),
                    error = %error,
                    "failed to fetch actual FUE"
                );
                None
            }
        };

        Ok(runs
            .iter()
            .map(|run| RunOverview::new(run, actual_fue))
            .collect())
    }

    /// Stops polling.
    pub async fn close(&self) {
        self.poller.stop().await;
    }
}

fn request_number(epoch_millis: i64) -> String {
    format!("SIM{:06}", epoch_millis.rem_euclid(1_000_000))
}

#[cfg(test)]
mod tests;
