use std::sync::Arc;
use std::time::Duration;

use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::{
    ChangeSet, SimulationRun, SimulationRunStatus, has_active_run, sort_runs_newest_first,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::simulation_ports::{SimulationGateway, SubmittedRun};

/// Lifecycle of the session's most recent submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Nothing submitted or tracked.
    Idle,
    /// A change-set is being posted.
    Submitting,
    /// Runs are being polled until none is active.
    Polling,
    /// The tracked run completed.
    Completed,
    /// The tracked run failed.
    Failed,
    /// Polling disabled itself after repeated failures.
    Degraded,
}

impl PollerState {
    /// Returns a stable label for logs and rendering.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Degraded => "degraded",
        }
    }
}

/// Poller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between two listing fetches.
    pub poll_interval: Duration,
    /// Consecutive listing failures after which polling stops.
    pub max_consecutive_failures: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_consecutive_failures: 3,
        }
    }
}

/// Notification published by the polling task.
#[derive(Debug, Clone, PartialEq)]
pub enum PollerEvent {
    /// A listing was fetched, newest run first.
    RunsUpdated(Vec<SimulationRun>),
    /// The tracked run reached a terminal status.
    RunFinished(SimulationRun),
    /// Polling stopped after repeated failures.
    PollingDegraded {
        /// Number of failed polls in a row.
        consecutive_failures: u32,
    },
}

#[derive(Debug)]
struct PollerStatus {
    state: PollerState,
    consecutive_failures: u32,
    tracked_run_id: Option<String>,
    runs: Vec<SimulationRun>,
    loop_running: bool,
}

struct PollerShared {
    scope: SessionScope,
    gateway: Arc<dyn SimulationGateway>,
    config: PollerConfig,
    status: Mutex<PollerStatus>,
    events: mpsc::UnboundedSender<PollerEvent>,
}

enum PollStep {
    Continue,
    Stop,
}

/// Submits change-sets and follows their runs until no run is active.
///
/// At most one polling task runs at a time. Dropping the poller aborts it.
pub struct RunStatusPoller {
    shared: Arc<PollerShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RunStatusPoller {
    /// Creates an idle poller and the receiver of its events.
    #[must_use]
    pub fn new(
        scope: SessionScope,
        gateway: Arc<dyn SimulationGateway>,
        config: PollerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PollerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(PollerShared {
            scope,
            gateway,
            config,
            status: Mutex::new(PollerStatus {
                state: PollerState::Idle,
                consecutive_failures: 0,
                tracked_run_id: None,
                runs: Vec::new(),
                loop_running: false,
            }),
            events,
        });

        (
            Self {
                shared,
                task: Mutex::new(None),
            },
            receiver,
        )
    }

    /// Returns the current state.
    pub async fn state(&self) -> PollerState {
        self.shared.status.lock().await.state
    }

    /// Returns the number of listing failures in a row.
    pub async fn consecutive_failures(&self) -> u32 {
        self.shared.status.lock().await.consecutive_failures
    }

    /// Returns the run awaited since the last submission.
    pub async fn tracked_run_id(&self) -> Option<String> {
        self.shared.status.lock().await.tracked_run_id.clone()
    }

    /// Returns the last fetched listing, newest run first.
    pub async fn runs(&self) -> Vec<SimulationRun> {
        self.shared.status.lock().await.runs.clone()
    }

    /// Returns true while the polling task is alive.
    pub async fn is_polling(&self) -> bool {
        self.shared.status.lock().await.loop_running
    }

    /// Posts a change-set, triggers the simulation job and starts polling.
    ///
    /// Failures return the poller to `Idle` and are never retried here.
    pub async fn submit(&self, change_set: &ChangeSet) -> AppResult<SubmittedRun> {
        {
            let mut status = self.shared.status.lock().await;
            if status.state == PollerState::Submitting {
                return Err(AppError::Conflict(
                    "a change-set submission is already in progress".to_owned(),
                ));
            }
            status.state = PollerState::Submitting;
        }

        let scope = &self.shared.scope;
        let submitted = match self.post_and_trigger(change_set).await {
            Ok(submitted) => submitted,
            Err(error) => {
                self.shared.status.lock().await.state = PollerState::Idle;
                warn!(
                    client = %scope.client(),
                    system = %scope.system(),
                    entries = change_set.len(),
                    error = %error,
                    "change-set submission failed"
                );
                return Err(error);
            }
        };

        {
            let mut status = self.shared.status.lock().await;
            status.state = PollerState::Polling;
            status.consecutive_failures = 0;
            status.tracked_run_id = Some(submitted.simulation_run_id.clone());
        }

        info!(
            client = %scope.client(),
            system = %scope.system(),
            run_id = %submitted.simulation_run_id,
            entries = change_set.len(),
            "change-set submitted"
        );

        self.start_polling().await;
        Ok(submitted)
    }

    /// Starts the polling task unless one is already running.
    pub async fn start_polling(&self) {
        {
            let mut status = self.shared.status.lock().await;
            if status.loop_running {
                debug!(scope = %self.shared.scope, "polling already running");
                return;
            }
            status.loop_running = true;
        }

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { poll_loop(&shared).await });
        *self.task.lock().await = Some(handle);
    }

    /// Halts polling and waits for the task to end.
    pub async fn stop(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            if let Err(error) = handle.await
                && !error.is_cancelled()
            {
                warn!(scope = %self.shared.scope, error = %error, "polling task ended abnormally");
            }
        }

        let mut status = self.shared.status.lock().await;
        status.loop_running = false;
        if status.state == PollerState::Polling {
            status.state = PollerState::Idle;
        }
        debug!(scope = %self.shared.scope, "polling stopped");
    }

    /// Fetches the listing once, outside the polling schedule.
    ///
    /// Success clears the failure count, settles a tracked run that finished
    /// meanwhile and resumes polling while a run is pending. Failure is
    /// returned and leaves the failure count unchanged.
    pub async fn refresh(&self) -> AppResult<Vec<SimulationRun>> {
        let mut runs = self.shared.gateway.list_runs(&self.shared.scope).await?;
        sort_runs_newest_first(&mut runs);

        let step = {
            let mut status = self.shared.status.lock().await;
            if status.state == PollerState::Degraded {
                status.state = if status.tracked_run_id.is_some() {
                    PollerState::Polling
                } else {
                    PollerState::Idle
                };
            }
            self.shared.apply_listing(&mut status, runs.clone())
        };

        if let PollStep::Continue = step {
            self.start_polling().await;
        }
        Ok(runs)
    }

    async fn post_and_trigger(&self, change_set: &ChangeSet) -> AppResult<SubmittedRun> {
        let scope = &self.shared.scope;
        let submitted = self
            .shared
            .gateway
            .submit_change_set(scope, change_set)
            .await?;
        self.shared.gateway.trigger_simulation(scope).await?;
        Ok(submitted)
    }
}

impl Drop for RunStatusPoller {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.try_lock()
            && let Some(handle) = task.take()
        {
            handle.abort();
        }
    }
}

impl PollerShared {
    fn publish(&self, event: PollerEvent) {
        if self.events.send(event).is_err() {
            debug!(scope = %self.scope, "poller event receiver dropped");
        }
    }

    async fn poll_once(&self) -> PollStep {
        match self.gateway.list_runs(&self.scope).await {
            Ok(mut runs) => {
                sort_runs_newest_first(&mut runs);
                self.observe_runs(runs).await
            }
            Err(error) => self.observe_failure(error).await,
        }
    }

    async fn observe_runs(&self, runs: Vec<SimulationRun>) -> PollStep {
        let mut status = self.status.lock().await;
        let step = self.apply_listing(&mut status, runs);
        if let PollStep::Stop = step {
            status.loop_running = false;
        }
        step
    }

    /// Records a fetched listing and decides whether polling must go on.
    fn apply_listing(&self, status: &mut PollerStatus, runs: Vec<SimulationRun>) -> PollStep {
        status.consecutive_failures = 0;
        status.runs = runs.clone();
        self.publish(PollerEvent::RunsUpdated(runs.clone()));

        let tracked = status
            .tracked_run_id
            .as_deref()
            .map(|run_id| runs.iter().find(|run| run.simulation_run_id == run_id));
        let tracked_pending = match tracked {
            Some(Some(run)) if !run.is_active() => {
                status.state = if run.status == SimulationRunStatus::Completed {
                    PollerState::Completed
                } else {
                    PollerState::Failed
                };
                status.tracked_run_id = None;
                info!(
                    scope = %self.scope,
                    run_id = %run.simulation_run_id,
                    status = %run.status.as_str(),
                    "simulation run finished"
                );
                self.publish(PollerEvent::RunFinished(run.clone()));
                false
            }
            Some(_) => true,
            None => false,
        };

        if tracked_pending || has_active_run(&runs) {
            if status.state == PollerState::Idle {
                status.state = PollerState::Polling;
            }
            return PollStep::Continue;
        }

        if status.state == PollerState::Polling {
            status.state = PollerState::Idle;
        }
        PollStep::Stop
    }

    async fn observe_failure(&self, error: AppError) -> PollStep {
        let mut status = self.status.lock().await;
        status.consecutive_failures = status.consecutive_failures.saturating_add(1);
        let consecutive_failures = status.consecutive_failures;

        warn!(
            scope = %self.scope,
            consecutive_failures,
            max_consecutive_failures = self.config.max_consecutive_failures,
            error = %error,
            "failed to poll simulation runs"
        );

        if consecutive_failures < self.config.max_consecutive_failures {
            return PollStep::Continue;
        }

        status.state = PollerState::Degraded;
        status.loop_running = false;
        warn!(
            scope = %self.scope,
            consecutive_failures,
            "polling disabled after repeated failures"
        );
        self.publish(PollerEvent::PollingDegraded {
            consecutive_failures,
        });
        PollStep::Stop
    }
}

async fn poll_loop(shared: &PollerShared) {
    let poll_interval_ms =
        u64::try_from(shared.config.poll_interval.as_millis()).unwrap_or(u64::MAX);
    debug!(scope = %shared.scope, poll_interval_ms, "polling started");

    loop {
        if let PollStep::Stop = shared.poll_once().await {
            break;
        }
        tokio::time::sleep(shared.config.poll_interval).await;
    }
}

#[cfg(test)]
mod tests;
