use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::AppConfig;
use crate::services::{LanguageModelService, RepositoryHost, SessionStore};

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub repository_host: Arc<dyn RepositoryHost>,
    pub language_model: Arc<dyn LanguageModelService>,
    pub sessions: Arc<dyn SessionStore>,
    /// Location of the draft cache; `None` disables caching.
    pub draft_cache_path: Option<PathBuf>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        repository_host: Arc<dyn RepositoryHost>,
        language_model: Arc<dyn LanguageModelService>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            repository_host,
            language_model,
            sessions,
            draft_cache_path: None,
        }
    }

    pub fn with_draft_cache(mut self, path: PathBuf) -> Self {
        self.draft_cache_path = Some(path);
        self
    }

    /// The hosting client to use for a request. A known session supplies the
    /// user's token; otherwise the server-wide token applies.
    pub fn host_for(&self, session_key: Option<&str>) -> Arc<dyn RepositoryHost> {
        match session_key.and_then(|key| self.sessions.get(key)) {
            Some(session) => self
                .repository_host
                .with_user_token(Some(session.access_token)),
            None => {
                if let Some(key) = session_key {
                    debug!(session = key, "no session found, using server token");
                }
                Arc::clone(&self.repository_host)
            }
        }
    }
}
