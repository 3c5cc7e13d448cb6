use clap::Args;

use crate::cmd::changelog::{register_token, release_session};
use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct AccountArgs {
    /// GitHub token for this run, used instead of the configured one.
    #[arg(long, env = "LOGSMITH_USER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

pub async fn run_whoami(ctx: &AppContext, args: AccountArgs) -> AppResult<()> {
    let session_key = register_token(ctx, args.token);
    let result = ctx
        .host_for(session_key.as_deref())
        .authenticated_user()
        .await;
    release_session(ctx, session_key.as_deref());
    let user = result?;

    match &user.name {
        Some(name) => println!("Authenticated as {} ({name})", user.login),
        None => println!("Authenticated as {}", user.login),
    }
    Ok(())
}

pub async fn run_repos(ctx: &AppContext, args: AccountArgs) -> AppResult<()> {
    let session_key = register_token(ctx, args.token);
    let result = ctx
        .host_for(session_key.as_deref())
        .list_admin_repositories()
        .await;
    release_session(ctx, session_key.as_deref());
    let repositories = result?;

    if repositories.is_empty() {
        println!("No repositories with admin access.");
        return Ok(());
    }
    for repo in repositories {
        let visibility = if repo.private { "private" } else { "public" };
        let language = repo.language.as_deref().unwrap_or("-");
        println!(
            "{}  [{visibility}, {language}, {}]  updated {}",
            repo.full_name, repo.default_branch, repo.updated_at
        );
        if let Some(description) = repo.description.as_deref().filter(|d| !d.is_empty()) {
            println!("    {description}");
        }
    }
    Ok(())
}
