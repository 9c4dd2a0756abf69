use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{Mutex, mpsc};

use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::{ChangeSet, SimulationRun, SimulationRunStatus};

use crate::simulation_ports::{SimulationGateway, SubmittedRun};

use super::{PollerConfig, PollerEvent, PollerState, RunStatusPoller};

enum Listing {
    Fail,
    Runs(Vec<SimulationRun>),
}

#[derive(Default)]
struct FakeGateway {
    fail_submit: bool,
    listings: Mutex<VecDeque<Listing>>,
    fallback: Mutex<Vec<SimulationRun>>,
    list_calls: Mutex<u32>,
    submissions: Mutex<u32>,
}

impl FakeGateway {
    async fn script(&self, listings: Vec<Listing>) {
        self.listings.lock().await.extend(listings);
    }

    async fn list_calls(&self) -> u32 {
        *self.list_calls.lock().await
    }
}

#[async_trait]
impl SimulationGateway for FakeGateway {
    async fn submit_change_set(
        &self,
        _scope: &SessionScope,
        _change_set: &ChangeSet,
    ) -> AppResult<SubmittedRun> {
        if self.fail_submit {
            return Err(AppError::Transport("request timed out".to_owned()));
        }
        let mut submissions = self.submissions.lock().await;
        *submissions += 1;
        Ok(SubmittedRun {
            simulation_run_id: submissions.to_string(),
            status: SimulationRunStatus::InProgress,
            timestamp: at_minute(*submissions),
        })
    }

    async fn trigger_simulation(&self, _scope: &SessionScope) -> AppResult<()> {
        Ok(())
    }

    async fn list_runs(&self, _scope: &SessionScope) -> AppResult<Vec<SimulationRun>> {
        *self.list_calls.lock().await += 1;
        match self.listings.lock().await.pop_front() {
            Some(Listing::Fail) => Err(AppError::Transport("503 Service Unavailable".to_owned())),
            Some(Listing::Runs(runs)) => Ok(runs),
            None => Ok(self.fallback.lock().await.clone()),
        }
    }

    async fn fetch_actual_fue(&self, _scope: &SessionScope) -> AppResult<f64> {
        Ok(306.0)
    }
}

fn at_minute(minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0)
        .single()
        .unwrap_or_default()
}

fn run(id: &str, status: SimulationRunStatus, minute: u32) -> SimulationRun {
    SimulationRun {
        simulation_run_id: id.to_owned(),
        status,
        timestamp: at_minute(minute),
        fue_required: Some(280.5),
        changes: Vec::new(),
    }
}

fn poller(
    gateway: Arc<FakeGateway>,
) -> (RunStatusPoller, mpsc::UnboundedReceiver<PollerEvent>) {
    let scope = SessionScope::new("100", "S4H").unwrap_or_else(|_| unreachable!());
    RunStatusPoller::new(scope, gateway, PollerConfig::default())
}

async fn next_matching<F>(
    events: &mut mpsc::UnboundedReceiver<PollerEvent>,
    predicate: F,
) -> Option<PollerEvent>
where
    F: Fn(&PollerEvent) -> bool,
{
    while let Some(event) = events.recv().await {
        if predicate(&event) {
            return Some(event);
        }
    }
    None
}

#[tokio::test(start_paused = true)]
async fn three_failures_disable_polling_until_next_submit() {
    let gateway = Arc::new(FakeGateway::default());
    gateway
        .script(vec![Listing::Fail, Listing::Fail, Listing::Fail])
        .await;
    let (poller, mut events) = poller(gateway.clone());

    assert!(poller.submit(&ChangeSet::default()).await.is_ok());
    let degraded = next_matching(&mut events, |event| {
        matches!(event, PollerEvent::PollingDegraded { .. })
    })
    .await;
    assert_eq!(
        degraded,
        Some(PollerEvent::PollingDegraded {
            consecutive_failures: 3
        })
    );
    assert_eq!(poller.state().await, PollerState::Degraded);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.list_calls().await, 3);
    assert!(!poller.is_polling().await);

    gateway
        .script(vec![
            Listing::Runs(vec![run("2", SimulationRunStatus::InProgress, 2)]),
            Listing::Runs(vec![run("2", SimulationRunStatus::Completed, 2)]),
        ])
        .await;
    let submitted = poller.submit(&ChangeSet::default()).await;
    assert_eq!(
        submitted.map(|run| run.simulation_run_id).ok().as_deref(),
        Some("2")
    );
    assert_eq!(poller.consecutive_failures().await, 0);
    assert_eq!(poller.state().await, PollerState::Polling);

    let finished = next_matching(&mut events, |event| {
        matches!(event, PollerEvent::RunFinished(_))
    })
    .await;
    assert!(matches!(
        finished,
        Some(PollerEvent::RunFinished(ref run)) if run.simulation_run_id == "2"
    ));
    assert_eq!(poller.state().await, PollerState::Completed);
    assert_eq!(gateway.list_calls().await, 5);
    assert_eq!(poller.tracked_run_id().await, None);
}

#[tokio::test(start_paused = true)]
async fn failures_below_the_limit_keep_polling() {
    let gateway = Arc::new(FakeGateway::default());
    gateway
        .script(vec![
            Listing::Fail,
            Listing::Fail,
            Listing::Runs(vec![run("1", SimulationRunStatus::ProcessingChanges, 1)]),
            Listing::Fail,
            Listing::Runs(vec![run("1", SimulationRunStatus::Failed, 1)]),
        ])
        .await;
    let (poller, mut events) = poller(gateway.clone());

    assert!(poller.submit(&ChangeSet::default()).await.is_ok());
    let finished = next_matching(&mut events, |event| {
        matches!(event, PollerEvent::RunFinished(_))
    })
    .await;

    assert!(matches!(
        finished,
        Some(PollerEvent::RunFinished(ref run)) if run.status == SimulationRunStatus::Failed
    ));
    assert_eq!(poller.state().await, PollerState::Failed);
    assert_eq!(gateway.list_calls().await, 5);
}

#[tokio::test(start_paused = true)]
async fn listings_are_sorted_newest_first() {
    let gateway = Arc::new(FakeGateway::default());
    gateway
        .script(vec![Listing::Runs(vec![
            run("1", SimulationRunStatus::Completed, 1),
            run("3", SimulationRunStatus::Completed, 30),
            run("2", SimulationRunStatus::Failed, 15),
        ])])
        .await;
    let (poller, mut events) = poller(gateway);

    poller.start_polling().await;
    let updated = events.recv().await;

    let ids: Vec<String> = match updated {
        Some(PollerEvent::RunsUpdated(runs)) => runs
            .into_iter()
            .map(|run| run.simulation_run_id)
            .collect(),
        _ => Vec::new(),
    };
    assert_eq!(ids, vec!["3", "2", "1"]);
    assert_eq!(poller.runs().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn starting_twice_runs_one_loop_and_stop_halts_it() {
    let gateway = Arc::new(FakeGateway::default());
    *gateway.fallback.lock().await = vec![run("1", SimulationRunStatus::InProgress, 1)];
    let (poller, _events) = poller(gateway.clone());

    poller.start_polling().await;
    poller.start_polling().await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(gateway.list_calls().await, 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(gateway.list_calls().await, 2);

    poller.stop().await;
    assert!(!poller.is_polling().await);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.list_calls().await, 2);
}

#[tokio::test(start_paused = true)]
async fn submit_failure_returns_to_idle_without_polling() {
    let gateway = Arc::new(FakeGateway {
        fail_submit: true,
        ..FakeGateway::default()
    });
    let (poller, _events) = poller(gateway.clone());

    let result = poller.submit(&ChangeSet::default()).await;
    assert!(matches!(result, Err(AppError::Transport(_))));
    assert_eq!(poller.state().await, PollerState::Idle);
    assert!(!poller.is_polling().await);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(gateway.list_calls().await, 0);
    assert_eq!(*gateway.submissions.lock().await, 0);
}

#[tokio::test(start_paused = true)]
async fn refresh_after_degradation_resumes_active_runs() {
    let gateway = Arc::new(FakeGateway::default());
    gateway
        .script(vec![Listing::Fail, Listing::Fail, Listing::Fail, Listing::Fail])
        .await;
    let (poller, mut events) = poller(gateway.clone());

    assert!(poller.submit(&ChangeSet::default()).await.is_ok());
    assert!(
        next_matching(&mut events, |event| {
            matches!(event, PollerEvent::PollingDegraded { .. })
        })
        .await
        .is_some()
    );

    let failed = poller.refresh().await;
    assert!(failed.is_err());
    assert_eq!(poller.state().await, PollerState::Degraded);

    *gateway.fallback.lock().await = vec![run("1", SimulationRunStatus::InProgress, 1)];
    let refreshed = poller.refresh().await;
    assert_eq!(refreshed.map(|runs| runs.len()).ok(), Some(1));
    assert_eq!(poller.consecutive_failures().await, 0);
    assert_eq!(poller.state().await, PollerState::Polling);
    assert!(poller.is_polling().await);

    poller.stop().await;
    assert_eq!(poller.state().await, PollerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn tracked_run_missing_from_listing_keeps_polling() {
    let gateway = Arc::new(FakeGateway::default());
    gateway
        .script(vec![
            Listing::Runs(Vec::new()),
            Listing::Runs(vec![run("1", SimulationRunStatus::Completed, 1)]),
        ])
        .await;
    let (poller, mut events) = poller(gateway.clone());

    assert!(poller.submit(&ChangeSet::default()).await.is_ok());
    let finished = next_matching(&mut events, |event| {
        matches!(event, PollerEvent::RunFinished(_))
    })
    .await;

    assert!(finished.is_some());
    assert_eq!(gateway.list_calls().await, 2);
    assert_eq!(poller.state().await, PollerState::Completed);
}

#[tokio::test(start_paused = true)]
async fn refresh_settles_a_run_that_finished_while_degraded() {
    let gateway = Arc::new(FakeGateway::default());
    gateway
        .script(vec![Listing::Fail, Listing::Fail, Listing::Fail])
        .await;
    let (poller, mut events) = poller(gateway.clone());

    assert!(poller.submit(&ChangeSet::default()).await.is_ok());
    assert!(
        next_matching(&mut events, |event| {
            matches!(event, PollerEvent::PollingDegraded { .. })
        })
        .await
        .is_some()
    );

    *gateway.fallback.lock().await = vec![run("1", SimulationRunStatus::Completed, 1)];
    assert!(poller.refresh().await.is_ok());

    let finished = next_matching(&mut events, |event| {
        matches!(event, PollerEvent::RunFinished(_))
    })
    .await;
    assert!(matches!(
        finished,
        Some(PollerEvent::RunFinished(ref run)) if run.simulation_run_id == "1"
    ));
    assert_eq!(poller.state().await, PollerState::Completed);
    assert_eq!(poller.tracked_run_id().await, None);
    assert!(!poller.is_polling().await);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.list_calls().await, 4);
}

#[tokio::test(start_paused = true)]
async fn submitting_right_after_a_run_finishes_polls_the_new_run() {
    let gateway = Arc::new(FakeGateway::default());
    gateway
        .script(vec![
            Listing::Runs(vec![run("1", SimulationRunStatus::Completed, 1)]),
            Listing::Runs(vec![
                run("2", SimulationRunStatus::InProgress, 2),
                run("1", SimulationRunStatus::Completed, 1),
            ]),
            Listing::Runs(vec![
                run("2", SimulationRunStatus::Completed, 2),
                run("1", SimulationRunStatus::Completed, 1),
            ]),
        ])
        .await;
    let (poller, mut events) = poller(gateway.clone());

    assert!(poller.submit(&ChangeSet::default()).await.is_ok());
    assert!(
        next_matching(&mut events, |event| {
            matches!(event, PollerEvent::RunFinished(_))
        })
        .await
        .is_some()
    );
    assert!(!poller.is_polling().await);

    assert!(poller.submit(&ChangeSet::default()).await.is_ok());
    assert!(poller.is_polling().await);
    let finished = next_matching(&mut events, |event| {
        matches!(event, PollerEvent::RunFinished(_))
    })
    .await;

    assert!(matches!(
        finished,
        Some(PollerEvent::RunFinished(ref run)) if run.simulation_run_id == "2"
    ));
    assert_eq!(gateway.list_calls().await, 3);
    assert!(!poller.is_polling().await);
}
