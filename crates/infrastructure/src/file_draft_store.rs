//! JSON file draft store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use authsim_application::DraftStore;
use authsim_core::{AppError, AppResult, SessionScope};
use authsim_domain::RoleDraft;
use tokio::fs;

/// Draft store keeping one JSON file per `(client, system)` scope.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash never leaves a half-written draft behind.
pub struct FileDraftStore {
    directory: PathBuf,
}

impl FileDraftStore {
    /// Creates a store rooted at `directory`, creating it when missing.
    pub async fn open(directory: impl Into<PathBuf>) -> AppResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).await.map_err(|error| {
            AppError::Persistence(format!(
                "failed to create draft directory {}: {error}",
                directory.display()
            ))
        })?;

        Ok(Self { directory })
    }

    /// Returns the directory holding the draft files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    fn draft_path(&self, scope: &SessionScope) -> PathBuf {
        self.directory
            .join(format!("{}.json", file_stem(scope.storage_key().as_str())))
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn load_draft(&self, scope: &SessionScope) -> AppResult<Option<RoleDraft>> {
        let path = self.draft_path(scope);
        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Persistence(format!(
                    "failed to read draft file {}: {error}",
                    path.display()
                )));
            }
        };

        serde_json::from_slice(&contents).map(Some).map_err(|error| {
            AppError::Persistence(format!(
                "draft file {} is corrupted: {error}",
                path.display()
            ))
        })
    }

    async fn save_draft(&self, scope: &SessionScope, draft: &RoleDraft) -> AppResult<()> {
        let path = self.draft_path(scope);
        let temporary_path = path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(draft).map_err(|error| {
            AppError::Persistence(format!("failed to serialize draft: {error}"))
        })?;

        fs::write(&temporary_path, contents).await.map_err(|error| {
            AppError::Persistence(format!(
                "failed to write draft file {}: {error}",
                temporary_path.display()
            ))
        })?;
        fs::rename(&temporary_path, &path).await.map_err(|error| {
            AppError::Persistence(format!(
                "failed to replace draft file {}: {error}",
                path.display()
            ))
        })
    }

    async fn clear_draft(&self, scope: &SessionScope) -> AppResult<()> {
        let path = self.draft_path(scope);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Persistence(format!(
                "failed to delete draft file {}: {error}",
                path.display()
            ))),
        }
    }
}

fn file_stem(storage_key: &str) -> String {
    storage_key
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '_' | '-' | '.' | '~' | '%') {
                character
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
