use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GitHubSettings;
use crate::domain::commit::{
    CommitAuthor, CommitRecord, CommitStats, CommitSummary, FileChange, FileStatus,
};
use crate::domain::format_timestamp;
use crate::domain::repository::{HostUser, RepoSlug, RepositorySummary};
use crate::error::HostingError;
use crate::services::{CommitQuery, RepositoryHost};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("logsmith/", env!("CARGO_PKG_VERSION"));
const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    fallback_token: Option<String>,
    user_token: Option<String>,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings) -> Result<Self, HostingError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| HostingError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            fallback_token: settings.token.clone(),
            user_token: None,
        })
    }

    fn token(&self) -> Result<&str, HostingError> {
        [self.user_token.as_deref(), self.fallback_token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|token| !token.is_empty())
            .ok_or_else(|| {
                HostingError::Config(
                    "no GitHub token available; sign in or set GITHUB_TOKEN".to_string(),
                )
            })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, HostingError> {
        let token = self.token()?;
        debug!(path, ?query, "calling GitHub");

        let response = self
            .http
            .get(self.endpoint(path))
            .header(AUTHORIZATION, format!("token {token}"))
            .header(ACCEPT, GITHUB_ACCEPT)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(HostingError::from_status(
                status.as_u16(),
                error_message(status, &body),
            ));
        }

        response.json::<T>().await.map_err(|err| {
            if err.is_decode() {
                HostingError::InvalidResponse(err.to_string())
            } else {
                transport_error(err)
            }
        })
    }
}

fn transport_error(err: reqwest::Error) -> HostingError {
    if err.is_timeout() {
        HostingError::Transport(format!("request timed out: {err}"))
    } else {
        HostingError::Transport(err.to_string())
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<GitHubErrorBody>(body) {
        return error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    fn with_user_token(&self, token: Option<String>) -> Arc<dyn RepositoryHost> {
        Arc::new(Self {
            user_token: token,
            ..self.clone()
        })
    }

    async fn list_commits(
        &self,
        repo: &RepoSlug,
        query: &CommitQuery,
    ) -> Result<Vec<CommitSummary>, HostingError> {
        self.token()?;
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let path = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        let per_page = query.limit.min(MAX_PAGE_SIZE);
        let mut commits = Vec::new();
        let mut page = 1usize;

        while commits.len() < query.limit {
            let mut params = vec![("per_page", per_page.to_string()), ("page", page.to_string())];
            if let Some(since) = &query.since {
                params.push(("since", format_timestamp(since)));
            }
            if let Some(until) = &query.until {
                params.push(("until", format_timestamp(until)));
            }

            let batch: Vec<GitHubCommitSummary> = self.get_json(&path, &params).await?;
            let received = batch.len();
            commits.extend(batch.into_iter().map(CommitSummary::from));
            if received < per_page {
                break;
            }
            page += 1;
        }

        commits.truncate(query.limit);
        debug!(repository = %repo, count = commits.len(), "listed commits");
        Ok(commits)
    }

    async fn get_commit_detail(
        &self,
        repo: &RepoSlug,
        sha: &str,
    ) -> Result<CommitRecord, HostingError> {
        let path = format!("/repos/{}/{}/commits/{}", repo.owner, repo.name, sha);
        let detail: GitHubCommitDetail = self.get_json(&path, &[]).await?;
        Ok(detail.into())
    }

    async fn authenticated_user(&self) -> Result<HostUser, HostingError> {
        let user: GitHubUser = self.get_json("/user", &[]).await?;
        Ok(HostUser {
            login: user.login,
            name: user.name,
        })
    }

    async fn list_admin_repositories(&self) -> Result<Vec<RepositorySummary>, HostingError> {
        let params = [
            ("type", "owner".to_string()),
            ("sort", "updated".to_string()),
            ("per_page", MAX_PAGE_SIZE.to_string()),
        ];
        let repositories: Vec<GitHubRepository> = self.get_json("/user/repos", &params).await?;
        Ok(repositories
            .into_iter()
            .filter(|repository| repository.permissions.admin)
            .map(|repository| RepositorySummary {
                name: repository.name,
                full_name: repository.full_name,
                description: repository.description,
                language: repository.language,
                updated_at: repository.updated_at,
                private: repository.private,
                default_branch: repository.default_branch,
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct GitHubErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct GitHubSignature {
    name: String,
    email: String,
    date: DateTime<Utc>,
}

impl From<GitHubSignature> for CommitAuthor {
    fn from(signature: GitHubSignature) -> Self {
        Self {
            name: signature.name,
            email: signature.email,
            timestamp: signature.date,
        }
    }
}

#[derive(Deserialize)]
struct GitHubCommitData {
    message: String,
    author: GitHubSignature,
}

#[derive(Deserialize)]
struct GitHubCommitSummary {
    sha: String,
    commit: GitHubCommitData,
    html_url: Option<String>,
}

impl From<GitHubCommitSummary> for CommitSummary {
    fn from(summary: GitHubCommitSummary) -> Self {
        Self {
            sha: summary.sha,
            message: summary.commit.message,
            author: summary.commit.author.into(),
            url: summary.html_url,
        }
    }
}

#[derive(Deserialize)]
struct GitHubCommitDetail {
    sha: String,
    commit: GitHubCommitData,
    html_url: Option<String>,
    stats: CommitStats,
    #[serde(default)]
    files: Vec<GitHubFile>,
}

impl From<GitHubCommitDetail> for CommitRecord {
    fn from(detail: GitHubCommitDetail) -> Self {
        Self {
            sha: detail.sha,
            message: detail.commit.message,
            author: detail.commit.author.into(),
            url: detail.html_url,
            stats: detail.stats,
            files: detail.files.into_iter().map(FileChange::from).collect(),
        }
    }
}

#[derive(Deserialize)]
struct GitHubFile {
    filename: String,
    previous_filename: Option<String>,
    status: FileStatus,
    additions: u64,
    deletions: u64,
    changes: u64,
    patch: Option<String>,
}

impl From<GitHubFile> for FileChange {
    fn from(file: GitHubFile) -> Self {
        Self {
            filename: file.filename,
            previous_filename: file.previous_filename,
            status: file.status,
            additions: file.additions,
            deletions: file.deletions,
            changes: file.changes,
            patch: file.patch,
        }
    }
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct GitHubRepository {
    name: String,
    full_name: String,
    description: Option<String>,
    language: Option<String>,
    updated_at: String,
    private: bool,
    default_branch: String,
    #[serde(default)]
    permissions: GitHubPermissions,
}

#[derive(Deserialize, Default)]
struct GitHubPermissions {
    #[serde(default)]
    admin: bool,
}
