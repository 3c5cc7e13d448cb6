use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cache::DraftCache;
use crate::context::AppContext;
use crate::domain::changelog::ChangelogDraft;
use crate::domain::format_timestamp;
use crate::domain::normalize::{NormalizedCommit, normalize_commits};
use crate::domain::prompt::build_prompt;
use crate::domain::repository::RepoSlug;
use crate::error::{AppError, AppResult};
use crate::services::{CommitQuery, SkippedCommit, fetch_commits_with_diffs};
use crate::workflow::synthesize::Synthesizer;

#[derive(Debug, Clone)]
pub struct ChangelogRequest {
    pub repository: RepoSlug,
    pub since: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
    /// Overrides the configured commit cap.
    pub max_commits: Option<usize>,
    pub session_key: Option<String>,
}

impl ChangelogRequest {
    pub fn new(repository: RepoSlug, since: DateTime<Utc>) -> Self {
        Self {
            repository,
            since,
            until: None,
            max_commits: None,
            session_key: None,
        }
    }
}

/// Normalized commits for a request, plus what the listing promised.
#[derive(Debug)]
pub struct CollectedCommits {
    pub listed: usize,
    pub commits: Vec<NormalizedCommit>,
    pub skipped: Vec<SkippedCommit>,
}

#[derive(Debug)]
pub struct ChangelogOutcome {
    pub draft: ChangelogDraft,
    pub listed: usize,
    pub skipped: Vec<SkippedCommit>,
}

impl ChangelogOutcome {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

pub async fn collect_commits(
    ctx: &AppContext,
    request: &ChangelogRequest,
) -> AppResult<CollectedCommits> {
    let limit = request
        .max_commits
        .unwrap_or(ctx.config.pipeline.max_commits);
    if limit == 0 {
        return Err(AppError::Configuration(
            "max_commits must be at least 1".to_string(),
        ));
    }

    let query = CommitQuery {
        since: Some(request.since),
        until: request.until,
        limit,
    };
    let host = ctx.host_for(request.session_key.as_deref());
    let batch = fetch_commits_with_diffs(host.as_ref(), &request.repository, &query).await?;

    if !batch.is_complete() {
        warn!(
            repository = %request.repository,
            listed = batch.listed,
            fetched = batch.commits.len(),
            "commit batch is incomplete"
        );
    }

    Ok(CollectedCommits {
        listed: batch.listed,
        commits: normalize_commits(&batch.commits, &ctx.config.pipeline.patch_budget),
        skipped: batch.skipped,
    })
}

/// Renders the prompt that `generate_changelog` would send, without calling
/// the language model.
pub async fn preview_prompt(ctx: &AppContext, request: &ChangelogRequest) -> AppResult<String> {
    let collected = collect_commits(ctx, request).await?;
    Ok(build_prompt(
        &request.repository.full_name(),
        &format_timestamp(&request.since),
        &collected.commits,
    ))
}

pub async fn generate_changelog(
    ctx: &AppContext,
    request: &ChangelogRequest,
) -> AppResult<ChangelogOutcome> {
    let collected = collect_commits(ctx, request).await?;
    let repository = request.repository.full_name();
    let since = format_timestamp(&request.since);
    let synthesizer = Synthesizer::new(ctx.language_model.clone());

    let draft = match &ctx.draft_cache_path {
        Some(path) => {
            let mut cache = DraftCache::load(path)?;
            synthesizer
                .synthesize_commits_cached(&mut cache, &repository, &since, &collected.commits)
                .await?
        }
        None => {
            synthesizer
                .synthesize_commits(&repository, &since, &collected.commits)
                .await?
        }
    };

    info!(
        repository = %repository,
        changes = draft.changes.len(),
        total_commits = draft.total_commits,
        "changelog drafted"
    );

    Ok(ChangelogOutcome {
        draft,
        listed: collected.listed,
        skipped: collected.skipped,
    })
}
