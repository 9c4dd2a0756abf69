use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;

use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::{
    AddSuggestion, ChangeSet, DynamicOption, ObjectAction, Role, RoleDraft, RoleInput,
    ServerAuthObject, SimulationRun, SimulationRunStatus,
};

use crate::run_status_poller::PollerConfig;
use crate::simulation_ports::{AuthObjectCatalog, DraftStore, SimulationGateway, SubmittedRun};

use super::{SimulationSession, request_number};

struct FakeCatalog;

#[async_trait]
impl AuthObjectCatalog for FakeCatalog {
    async fn list_roles(&self, _scope: &SessionScope) -> AppResult<Vec<Role>> {
        Ok(vec![role()])
    }

    async fn fetch_role_objects(
        &self,
        _scope: &SessionScope,
        _role_id: &str,
    ) -> AppResult<Vec<ServerAuthObject>> {
        Ok(vec![ServerAuthObject {
            object: "S_TCODE".to_owned(),
            classification: "GB Advanced Use".to_owned(),
            field_name: "TCD".to_owned(),
            value_low: "ME21N".to_owned(),
            value_high: String::new(),
            ttext: None,
        }])
    }

    async fn fetch_dynamic_options(
        &self,
        _scope: &SessionScope,
        _object: &str,
        _field_name: &str,
    ) -> AppResult<Vec<DynamicOption>> {
        Ok(Vec::new())
    }

    async fn fetch_add_suggestions(
        &self,
        _scope: &SessionScope,
        _object: &str,
        _field_name: &str,
    ) -> AppResult<Vec<AddSuggestion>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FakeStore {
    drafts: Mutex<HashMap<String, RoleDraft>>,
}

#[async_trait]
impl DraftStore for FakeStore {
    async fn load_draft(&self, scope: &SessionScope) -> AppResult<Option<RoleDraft>> {
        Ok(self.drafts.lock().await.get(&scope.storage_key()).cloned())
    }

    async fn save_draft(&self, scope: &SessionScope, draft: &RoleDraft) -> AppResult<()> {
        self.drafts
            .lock()
            .await
            .insert(scope.storage_key(), draft.clone());
        Ok(())
    }

    async fn clear_draft(&self, scope: &SessionScope) -> AppResult<()> {
        self.drafts.lock().await.remove(&scope.storage_key());
        Ok(())
    }
}

struct FakeGateway {
    final_status: SimulationRunStatus,
    fail_listing: bool,
    actual_fue: Option<f64>,
    submitted: Mutex<Vec<ChangeSet>>,
}

impl FakeGateway {
    fn finishing_with(final_status: SimulationRunStatus) -> Self {
        Self {
            final_status,
            fail_listing: false,
            actual_fue: Some(300.5),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SimulationGateway for FakeGateway {
    async fn submit_change_set(
        &self,
        _scope: &SessionScope,
        change_set: &ChangeSet,
    ) -> AppResult<SubmittedRun> {
        self.submitted.lock().await.push(change_set.clone());
        Ok(SubmittedRun {
            simulation_run_id: "41".to_owned(),
            status: SimulationRunStatus::InProgress,
            timestamp: timestamp(),
        })
    }

    async fn trigger_simulation(&self, _scope: &SessionScope) -> AppResult<()> {
        Ok(())
    }

    async fn list_runs(&self, _scope: &SessionScope) -> AppResult<Vec<SimulationRun>> {
        if self.fail_listing {
            return Err(AppError::Transport("connection reset".to_owned()));
        }
        Ok(vec![SimulationRun {
            simulation_run_id: "41".to_owned(),
            status: self.final_status,
            timestamp: timestamp(),
            fue_required: Some(280.5),
            changes: Vec::new(),
        }])
    }

    async fn fetch_actual_fue(&self, _scope: &SessionScope) -> AppResult<f64> {
        self.actual_fue
            .ok_or_else(|| AppError::Transport("license summary unavailable".to_owned()))
    }
}

fn timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

fn scope() -> SessionScope {
    SessionScope::new("100", "S4H").unwrap_or_else(|_| unreachable!())
}

fn role() -> Role {
    Role::new(RoleInput {
        id: "Z_ROLE_A".to_owned(),
        ..RoleInput::default()
    })
    .unwrap_or_else(|_| unreachable!())
}

async fn session_with(
    gateway: Arc<FakeGateway>,
    store: Arc<FakeStore>,
) -> SimulationSession {
    SimulationSession::open(
        scope(),
        Arc::new(FakeCatalog),
        gateway,
        store,
        PollerConfig::default(),
    )
    .await
}

async fn stage_removal(session: &mut SimulationSession) {
    let manager = session.manager_mut();
    assert!(manager.fetch_role(&role()).await.is_ok());
    assert!(
        manager
            .record_action(1, Some(ObjectAction::Remove))
            .await
            .is_ok()
    );
}

#[test]
fn request_numbers_keep_the_last_six_digits() {
    assert_eq!(request_number(1_760_000_123_456), "SIM123456");
    assert_eq!(request_number(42), "SIM000042");
}

#[tokio::test(start_paused = true)]
async fn empty_draft_is_not_submitted() {
    let gateway = Arc::new(FakeGateway::finishing_with(SimulationRunStatus::Completed));
    let mut session = session_with(gateway.clone(), Arc::new(FakeStore::default())).await;

    let result = session.run_simulation().await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(gateway.submitted.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn completed_run_clears_the_draft() {
    let gateway = Arc::new(FakeGateway::finishing_with(SimulationRunStatus::Completed));
    let store = Arc::new(FakeStore::default());
    let mut session = session_with(gateway.clone(), store.clone()).await;
    stage_removal(&mut session).await;

    let receipt = session.run_simulation().await;
    assert!(receipt.is_ok());
    let receipt = receipt.unwrap_or_else(|_| unreachable!());
    assert!(receipt.request_number.starts_with("SIM"));
    assert_eq!(receipt.request_number.len(), 9);
    assert_eq!(receipt.run.simulation_run_id, "41");
    assert_eq!(receipt.summary.to_string(), "1 Remove");

    let outcome = session.await_outcome().await;
    assert_eq!(
        outcome.map(|run| run.status).ok(),
        Some(SimulationRunStatus::Completed)
    );
    assert!(session.manager().draft().is_empty());
    assert!(store.drafts.lock().await.is_empty());
    assert_eq!(gateway.submitted.lock().await[0].len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_run_keeps_the_draft() {
    let gateway = Arc::new(FakeGateway::finishing_with(SimulationRunStatus::Failed));
    let store = Arc::new(FakeStore::default());
    let mut session = session_with(gateway, store.clone()).await;
    stage_removal(&mut session).await;

    assert!(session.run_simulation().await.is_ok());
    let outcome = session.await_outcome().await;
    assert_eq!(
        outcome.map(|run| run.status).ok(),
        Some(SimulationRunStatus::Failed)
    );
    assert!(session.manager().has_pending_changes());
    assert_eq!(store.drafts.lock().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn degraded_polling_is_reported() {
    let gateway = Arc::new(FakeGateway {
        fail_listing: true,
        ..FakeGateway::finishing_with(SimulationRunStatus::Completed)
    });
    let mut session = session_with(gateway, Arc::new(FakeStore::default())).await;
    stage_removal(&mut session).await;

    assert!(session.run_simulation().await.is_ok());
    let outcome = session.await_outcome().await;
    assert!(matches!(
        outcome,
        Err(AppError::PollingDegraded {
            consecutive_failures: 3
        })
    ));
    assert!(session.manager().has_pending_changes());
    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn overviews_without_actual_fue_have_no_savings() {
    let gateway = Arc::new(FakeGateway {
        actual_fue: None,
        ..FakeGateway::finishing_with(SimulationRunStatus::Completed)
    });
    let session = session_with(gateway, Arc::new(FakeStore::default())).await;

    let overviews = session.run_overviews().await.unwrap_or_default();
    assert_eq!(overviews.len(), 1);
    assert_eq!(overviews[0].simulation_fue, Some(280.5));
    assert_eq!(overviews[0].savings, None);
}

#[tokio::test(start_paused = true)]
async fn overviews_compute_savings() {
    let gateway = Arc::new(FakeGateway::finishing_with(SimulationRunStatus::Completed));
    let session = session_with(gateway, Arc::new(FakeStore::default())).await;

    let overviews = session.run_overviews().await.unwrap_or_default();
    assert_eq!(overviews[0].savings, Some(20.0));
}
