use authsim_application::DraftStore;
use authsim_core::SessionScope;
use authsim_domain::{AuthObjectChange, ObjectAction, RoleDraft};

use super::{FileDraftStore, file_stem};

fn scope() -> SessionScope {
    SessionScope::new("100", "S4H").unwrap_or_else(|_| unreachable!())
}

fn draft() -> RoleDraft {
    let mut row = AuthObjectChange::new_row(1_760_000_000_000);
    row.object = "M_EINF_EKO".to_owned();
    row.field_name = "ACTVT".to_owned();
    row.value_low = "01".to_owned();
    row.action = Some(ObjectAction::Add);

    let mut draft = RoleDraft::new();
    draft.set_rows("Z_ROLE_A", vec![row]);
    draft
}

async fn store() -> (tempfile::TempDir, FileDraftStore) {
    let directory = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let store = FileDraftStore::open(directory.path().join("drafts"))
        .await
        .unwrap_or_else(|_| unreachable!());
    (directory, store)
}

#[tokio::test]
async fn missing_draft_loads_as_none() {
    let (_directory, store) = store().await;
    assert!(matches!(store.load_draft(&scope()).await, Ok(None)));
    assert!(store.clear_draft(&scope()).await.is_ok());
}

#[tokio::test]
async fn saved_draft_survives_reopening() {
    let (directory, store) = store().await;
    assert!(store.save_draft(&scope(), &draft()).await.is_ok());
    assert!(
        store
            .directory()
            .join("all_edited_roles_100_S4H.json")
            .exists()
    );

    let reopened = FileDraftStore::open(directory.path().join("drafts"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let loaded = reopened.load_draft(&scope()).await.unwrap_or_default();
    assert_eq!(loaded, Some(draft()));
}

#[tokio::test]
async fn scopes_do_not_share_drafts() {
    let (_directory, store) = store().await;
    let other = SessionScope::new("200", "S4H").unwrap_or_else(|_| unreachable!());
    assert!(store.save_draft(&scope(), &draft()).await.is_ok());

    assert!(matches!(store.load_draft(&other).await, Ok(None)));
}

#[tokio::test]
async fn corrupted_draft_is_a_persistence_error() {
    let (_directory, store) = store().await;
    let path = store.directory().join("all_edited_roles_100_S4H.json");
    assert!(tokio::fs::write(&path, b"{\"roles\": [").await.is_ok());

    let loaded = store.load_draft(&scope()).await;
    assert!(matches!(
        loaded,
        Err(authsim_core::AppError::Persistence(_))
    ));
}

#[tokio::test]
async fn clear_removes_the_file() {
    let (_directory, store) = store().await;
    assert!(store.save_draft(&scope(), &draft()).await.is_ok());
    assert!(store.clear_draft(&scope()).await.is_ok());

    assert!(matches!(store.load_draft(&scope()).await, Ok(None)));
}

#[test]
fn file_stems_stay_inside_the_directory() {
    let scope = SessionScope::new("../x", "S4H").unwrap_or_else(|_| unreachable!());
    let stem = file_stem(scope.storage_key().as_str());
    assert_eq!(stem, "all_edited_roles_..%2Fx_S4H");
    assert!(!stem.contains('/'));
}

#[tokio::test]
async fn underscored_scopes_use_separate_files() {
    let (_directory, store) = store().await;
    let left = SessionScope::new("A_B", "C").unwrap_or_else(|_| unreachable!());
    let right = SessionScope::new("A", "B_C").unwrap_or_else(|_| unreachable!());

    assert!(store.save_draft(&left, &draft()).await.is_ok());
    assert!(matches!(store.load_draft(&right).await, Ok(None)));
    assert_eq!(store.load_draft(&left).await.ok().flatten(), Some(draft()));
}
