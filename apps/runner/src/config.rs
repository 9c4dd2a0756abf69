use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use authsim_application::{DraftStore, PollerConfig};
use authsim_core::{AppError, AppResult, SessionScope};
use authsim_infrastructure::{FileDraftStore, InMemoryDraftStore, RedisDraftStore};

/// Backend used to persist unsaved drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStoreKind {
    /// One JSON file per scope.
    File,
    /// One Redis key per scope.
    Redis,
    /// Process memory only.
    Memory,
}

impl DraftStoreKind {
    fn parse(value: &str) -> AppResult<Self> {
        match value.trim() {
            "file" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            _ => Err(AppError::Validation(format!(
                "invalid AUTHSIM_DRAFT_STORE value '{value}', expected file, redis or memory"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub api_base_url: String,
    pub scope: SessionScope,
    pub draft_store: DraftStoreKind,
    pub draft_dir: PathBuf,
    pub redis_url: Option<String>,
    pub poll_interval_ms: u64,
    pub max_poll_failures: u32,
    pub http_timeout_seconds: u64,
}

impl RunnerConfig {
    pub fn load() -> AppResult<Self> {
        let api_base_url = env::var("AUTHSIM_API_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let scope = SessionScope::new(
            required_env("AUTHSIM_CLIENT")?,
            required_env("AUTHSIM_SYSTEM")?,
        )?;
        let draft_store = match env::var("AUTHSIM_DRAFT_STORE") {
            Ok(value) => DraftStoreKind::parse(value.as_str())?,
            Err(_) => DraftStoreKind::File,
        };
        let draft_dir = env::var("AUTHSIM_DRAFT_DIR")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map_or_else(|| PathBuf::from(".authsim/drafts"), PathBuf::from);
        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let poll_interval_ms = parse_env_u64("AUTHSIM_POLL_INTERVAL_MS", 5000)?;
        let max_poll_failures = parse_env_u32("AUTHSIM_MAX_POLL_FAILURES", 3)?;
        let http_timeout_seconds = parse_env_u64("AUTHSIM_HTTP_TIMEOUT_SECONDS", 15)?;

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "AUTHSIM_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        if max_poll_failures == 0 {
            return Err(AppError::Validation(
                "AUTHSIM_MAX_POLL_FAILURES must be greater than zero".to_owned(),
            ));
        }

        if http_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "AUTHSIM_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if draft_store == DraftStoreKind::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when AUTHSIM_DRAFT_STORE is redis".to_owned(),
            ));
        }

        Ok(Self {
            api_base_url,
            scope,
            draft_store,
            draft_dir,
            redis_url,
            poll_interval_ms,
            max_poll_failures,
            http_timeout_seconds,
        })
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_consecutive_failures: self.max_poll_failures,
        }
    }

    pub async fn build_draft_store(&self) -> AppResult<Arc<dyn DraftStore>> {
        match self.draft_store {
            DraftStoreKind::File => Ok(Arc::new(
                FileDraftStore::open(self.draft_dir.clone()).await?,
            )),
            DraftStoreKind::Memory => Ok(Arc::new(InMemoryDraftStore::new())),
            DraftStoreKind::Redis => {
                let redis_url = self.redis_url.as_deref().ok_or_else(|| {
                    AppError::Validation("REDIS_URL is required for redis drafts".to_owned())
                })?;
                let client = redis::Client::open(redis_url).map_err(|error| {
                    AppError::Validation(format!("invalid REDIS_URL: {error}"))
                })?;
                Ok(Arc::new(RedisDraftStore::new(client, "authsim:drafts")))
            }
        }
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
