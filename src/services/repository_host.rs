use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::commit::{CommitRecord, CommitSummary};
use crate::domain::repository::{HostUser, RepoSlug, RepositorySummary};
use crate::error::HostingError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitQuery {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: usize,
}

#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Returns a host that authenticates as the given user, falling back to the
    /// server-wide token when `token` is `None` or blank.
    fn with_user_token(&self, token: Option<String>) -> Arc<dyn RepositoryHost>;

    async fn list_commits(
        &self,
        repo: &RepoSlug,
        query: &CommitQuery,
    ) -> Result<Vec<CommitSummary>, HostingError>;

    async fn get_commit_detail(
        &self,
        repo: &RepoSlug,
        sha: &str,
    ) -> Result<CommitRecord, HostingError>;

    async fn authenticated_user(&self) -> Result<HostUser, HostingError>;

    async fn list_admin_repositories(&self) -> Result<Vec<RepositorySummary>, HostingError>;
}

#[derive(Debug)]
pub struct SkippedCommit {
    pub sha: String,
    pub error: HostingError,
}

/// Commits whose diff detail was retrieved, plus an account of those that
/// were not. `commits.len() < listed` whenever anything was skipped.
#[derive(Debug)]
pub struct CommitBatch {
    pub listed: usize,
    pub commits: Vec<CommitRecord>,
    pub skipped: Vec<SkippedCommit>,
}

impl CommitBatch {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.commits.len() == self.listed
    }
}

/// Lists up to `query.limit` commits and fetches their detail one at a time,
/// in listing order. A failed detail fetch skips that commit; a failed listing
/// fails the whole call.
pub async fn fetch_commits_with_diffs(
    host: &dyn RepositoryHost,
    repo: &RepoSlug,
    query: &CommitQuery,
) -> Result<CommitBatch, HostingError> {
    let summaries = host.list_commits(repo, query).await?;
    let listed: Vec<CommitSummary> = summaries.into_iter().take(query.limit).collect();
    info!(repository = %repo, listed = listed.len(), "fetching commit details");

    let mut commits = Vec::with_capacity(listed.len());
    let mut skipped = Vec::new();
    for summary in &listed {
        match host.get_commit_detail(repo, &summary.sha).await {
            Ok(record) => commits.push(record),
            Err(error) => {
                warn!(
                    repository = %repo,
                    sha = %summary.sha,
                    status = ?error.status(),
                    %error,
                    "skipping commit whose detail could not be fetched"
                );
                skipped.push(SkippedCommit {
                    sha: summary.sha.clone(),
                    error,
                });
            }
        }
    }

    Ok(CommitBatch {
        listed: listed.len(),
        commits,
        skipped,
    })
}
