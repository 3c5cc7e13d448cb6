use std::io;

use chrono::{DateTime, Utc};
use clap::Args;

use crate::context::AppContext;
use crate::domain::parse_timestamp;
use crate::domain::repository::RepoSlug;
use crate::error::AppResult;
use crate::services::Session;
use crate::workflow::changelog::{
    ChangelogOutcome, ChangelogRequest, collect_commits, generate_changelog, preview_prompt,
};

/// Session key under which a `--token` flag is registered.
pub const CLI_SESSION_KEY: &str = "cli";

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Repository in `owner/name` form.
    pub repository: RepoSlug,
    /// Start of the window (RFC 3339, e.g. 2024-01-01T00:00:00Z).
    #[arg(long, value_parser = parse_timestamp)]
    pub since: DateTime<Utc>,
    /// End of the window (RFC 3339).
    #[arg(long, value_parser = parse_timestamp)]
    pub until: Option<DateTime<Utc>>,
    /// Override the configured commit cap.
    #[arg(long)]
    pub max_commits: Option<usize>,
    /// GitHub token for this run, used instead of the configured one.
    #[arg(long, env = "LOGSMITH_USER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl WindowArgs {
    /// Builds the workflow request, registering `--token` as the session.
    pub fn into_request(self, ctx: &AppContext) -> ChangelogRequest {
        let session_key = register_token(ctx, self.token);
        ChangelogRequest {
            repository: self.repository,
            since: self.since,
            until: self.until,
            max_commits: self.max_commits,
            session_key,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub window: WindowArgs,
    /// Print the draft as JSON instead of Markdown.
    #[arg(long)]
    pub json: bool,
}

pub fn register_token(ctx: &AppContext, token: Option<String>) -> Option<String> {
    let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
    ctx.sessions.set(
        CLI_SESSION_KEY.to_string(),
        Session {
            access_token: token,
            login: None,
        },
    );
    Some(CLI_SESSION_KEY.to_string())
}

pub fn release_session(ctx: &AppContext, session_key: Option<&str>) {
    if let Some(key) = session_key {
        ctx.sessions.delete(key);
    }
}

pub async fn run_generate(ctx: &AppContext, args: GenerateArgs) -> AppResult<()> {
    let request = args.window.into_request(ctx);
    let result = generate_changelog(ctx, &request).await;
    release_session(ctx, request.session_key.as_deref());
    let outcome = result?;

    report_skipped(&outcome);
    if args.json {
        let rendered = serde_json::to_string_pretty(&outcome.draft).map_err(io::Error::from)?;
        println!("{rendered}");
    } else {
        print!("{}", outcome.draft.to_markdown());
    }
    Ok(())
}

pub async fn run_prompt(ctx: &AppContext, args: WindowArgs) -> AppResult<()> {
    let request = args.into_request(ctx);
    let result = preview_prompt(ctx, &request).await;
    release_session(ctx, request.session_key.as_deref());
    let prompt = result?;
    println!("{prompt}");
    Ok(())
}

pub async fn run_commits(ctx: &AppContext, args: WindowArgs) -> AppResult<()> {
    let request = args.into_request(ctx);
    let result = collect_commits(ctx, &request).await;
    release_session(ctx, request.session_key.as_deref());
    let collected = result?;
    for skipped in &collected.skipped {
        eprintln!("Warning: skipped commit {}: {}", skipped.sha, skipped.error);
    }
    let rendered = serde_json::to_string_pretty(&collected.commits).map_err(io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

fn report_skipped(outcome: &ChangelogOutcome) {
    if !outcome.is_partial() {
        return;
    }
    eprintln!(
        "Warning: {} of {} commits could not be fetched and were left out:",
        outcome.skipped.len(),
        outcome.listed
    );
    for skipped in &outcome.skipped {
        eprintln!("  {}: {}", skipped.sha, skipped.error);
    }
}
