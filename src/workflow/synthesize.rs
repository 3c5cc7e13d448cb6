use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info};

use crate::cache::DraftCache;
use crate::domain::changelog::{ChangelogBody, ChangelogDraft, DraftMetadata};
use crate::domain::normalize::NormalizedCommit;
use crate::domain::prompt::build_prompt;
use crate::error::{AppResult, SynthesisError};
use crate::services::LanguageModelService;

/// Drafts are stamped with whole-second UTC timestamps.
pub fn generated_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

pub struct Synthesizer {
    model: Arc<dyn LanguageModelService>,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModelService>) -> Self {
        Self { model }
    }

    /// Sends `prompt` to the backend and validates the reply against the
    /// changelog contract.
    pub async fn synthesize(
        &self,
        prompt: &str,
        metadata: DraftMetadata,
    ) -> Result<ChangelogDraft, SynthesisError> {
        info!(
            model = %self.model.model_name(),
            repository = %metadata.repository,
            commits = metadata.total_commits,
            "synthesizing changelog"
        );
        let text = self.model.complete(prompt).await?;
        let body = ChangelogBody::parse(&text)?;
        debug!(changes = body.changes.len(), "model output validated");
        Ok(ChangelogDraft::from_body(body, metadata, generated_now()))
    }

    /// Builds the prompt for `commits` and synthesizes it. An empty commit set
    /// never reaches the backend.
    pub async fn synthesize_commits(
        &self,
        repository: &str,
        since: &str,
        commits: &[NormalizedCommit],
    ) -> Result<ChangelogDraft, SynthesisError> {
        let metadata = metadata(repository, since, commits);
        if commits.is_empty() {
            info!(repository, since, "no commits in window, skipping synthesis");
            return Ok(ChangelogDraft::no_commits(metadata, generated_now()));
        }

        let prompt = build_prompt(repository, since, commits);
        self.synthesize(&prompt, metadata).await
    }

    /// Like `synthesize_commits`, but answers from `cache` when the same model
    /// has already seen the same prompt, and stores fresh results.
    pub async fn synthesize_commits_cached(
        &self,
        cache: &mut DraftCache,
        repository: &str,
        since: &str,
        commits: &[NormalizedCommit],
    ) -> AppResult<ChangelogDraft> {
        if commits.is_empty() {
            return Ok(self.synthesize_commits(repository, since, commits).await?);
        }

        let prompt = build_prompt(repository, since, commits);
        let key = DraftCache::compute_key(self.model.model_name(), &prompt);
        let metadata = metadata(repository, since, commits);

        if let Some(body) = cache.get(&key) {
            info!(repository, "reusing cached changelog draft");
            return Ok(ChangelogDraft::from_body(body, metadata, generated_now()));
        }

        let draft = self.synthesize(&prompt, metadata).await?;
        cache.insert(key, draft.body());
        cache.save()?;
        Ok(draft)
    }
}

fn metadata(repository: &str, since: &str, commits: &[NormalizedCommit]) -> DraftMetadata {
    DraftMetadata {
        repository: repository.to_string(),
        since: Some(since.to_string()),
        total_commits: commits.len(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedModel, VALID_REPLY};
    use super::*;
    use crate::domain::changelog::ChangeType;
    use crate::domain::normalize::{PatchBudget, normalize_commits};
    use crate::services::repository_host::testing::record;

    fn commits() -> Vec<NormalizedCommit> {
        normalize_commits(&[record("aaaaaaaaaaaa"), record("bbbbbbbbbbbb")], &PatchBudget::default())
    }

    #[tokio::test]
    async fn zero_commits_skip_the_backend() {
        let model = Arc::new(ScriptedModel::replying(VALID_REPLY));
        let synthesizer = Synthesizer::new(model.clone());

        let draft = synthesizer
            .synthesize_commits("acme/widgets", "2024-01-01T00:00:00Z", &[])
            .await
            .unwrap();

        assert!(model.prompts().is_empty());
        assert_eq!(draft.total_commits, 0);
        assert!(draft.changes.is_empty());
        assert_eq!(draft.summary, "No commits found since 2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn valid_reply_becomes_a_draft() {
        let model = Arc::new(ScriptedModel::replying(VALID_REPLY));
        let synthesizer = Synthesizer::new(model.clone());

        let draft = synthesizer
            .synthesize_commits("acme/widgets", "2024-01-01T00:00:00Z", &commits())
            .await
            .unwrap();

        assert_eq!(draft.repository, "acme/widgets");
        assert_eq!(draft.total_commits, 2);
        assert_eq!(draft.changes[0].kind, ChangeType::Feature);
        assert_eq!(draft.generated_at.timestamp_subsec_nanos(), 0);
        assert_eq!(model.prompts().len(), 1);
        assert!(model.prompts()[0].contains("aaaaaaaa"));
    }

    #[tokio::test]
    async fn non_json_reply_is_schema_error() {
        let synthesizer = Synthesizer::new(Arc::new(ScriptedModel::replying("not json")));
        let result = synthesizer
            .synthesize_commits("acme/widgets", "2024-01-01T00:00:00Z", &commits())
            .await;
        assert!(matches!(result, Err(SynthesisError::Schema(_))));
    }

    #[tokio::test]
    async fn unknown_change_type_is_schema_error() {
        let reply = r#"{"summary": "s", "changes": [
            {"type": "chore", "title": "t", "description": "d", "impact": "low"}
        ]}"#;
        let synthesizer = Synthesizer::new(Arc::new(ScriptedModel::replying(reply)));
        let result = synthesizer.synthesize("prompt", metadata("a/b", "x", &commits())).await;
        assert!(matches!(result, Err(SynthesisError::Schema(_))));
    }

    #[tokio::test]
    async fn backend_errors_propagate() {
        let synthesizer = Synthesizer::new(Arc::new(ScriptedModel::failing(
            SynthesisError::Upstream {
                status: 503,
                body: "unavailable".to_string(),
            },
        )));
        let result = synthesizer
            .synthesize_commits("acme/widgets", "2024-01-01T00:00:00Z", &commits())
            .await;
        assert!(matches!(
            result,
            Err(SynthesisError::Upstream { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        let commits = commits();

        let first = Arc::new(ScriptedModel::replying(VALID_REPLY));
        let mut cache = DraftCache::load(&path).unwrap();
        let draft = Synthesizer::new(first.clone())
            .synthesize_commits_cached(&mut cache, "acme/widgets", "2024-01-01T00:00:00Z", &commits)
            .await
            .unwrap();
        assert_eq!(first.prompts().len(), 1);

        let second = Arc::new(ScriptedModel::replying("not json"));
        let mut reloaded = DraftCache::load(&path).unwrap();
        let cached = Synthesizer::new(second.clone())
            .synthesize_commits_cached(
                &mut reloaded,
                "acme/widgets",
                "2024-01-01T00:00:00Z",
                &commits,
            )
            .await
            .unwrap();

        assert!(second.prompts().is_empty());
        assert_eq!(cached.body(), draft.body());
        assert_eq!(cached.total_commits, 2);
    }

    #[tokio::test]
    async fn invalid_output_is_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        let mut cache = DraftCache::load(&path).unwrap();

        let result = Synthesizer::new(Arc::new(ScriptedModel::replying("{}")))
            .synthesize_commits_cached(&mut cache, "acme/widgets", "2024-01-01T00:00:00Z", &commits())
            .await;

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
