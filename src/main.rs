mod cache;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::DraftCache;
use crate::cmd::changelog::{self as changelog_cmd, GenerateArgs, WindowArgs};
use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::github::{self as github_cmd, AccountArgs};
use crate::config::{AppConfig, LlmProvider};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::github::GitHubClient;
use crate::infra::llm::OpenAiClient;
use crate::infra::session::MemorySessionStore;
use crate::services::LanguageModelService;

#[derive(Parser)]
#[command(
    name = "logsmith",
    author,
    version,
    about = "Draft user-facing changelogs from a repository's commit history"
)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch commits, summarize them with the language model and print the changelog.
    Generate(GenerateArgs),
    /// Print the prompt that `generate` would send, without calling the model.
    Prompt(WindowArgs),
    /// Print the normalized commits for a window as JSON.
    Commits(WindowArgs),
    /// Show the GitHub account behind the configured token.
    Whoami(AccountArgs),
    /// List repositories the GitHub account administers.
    Repos(AccountArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    tokio::select! {
        result = run(cli.command) => {
            if let Err(error) = result {
                eprintln!("Error: {error}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted.");
            std::process::exit(130);
        }
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,logsmith=info".to_string(),
            2 => "info,logsmith=debug".to_string(),
            _ => "debug,logsmith=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(verbose >= 2)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

async fn run(command: Commands) -> AppResult<()> {
    match command {
        Commands::Config(args) => config_cmd::run(args.command),
        Commands::Generate(args) => {
            let ctx = build_context()?;
            changelog_cmd::run_generate(&ctx, args).await
        }
        Commands::Prompt(args) => {
            let ctx = build_context()?;
            changelog_cmd::run_prompt(&ctx, args).await
        }
        Commands::Commits(args) => {
            let ctx = build_context()?;
            changelog_cmd::run_commits(&ctx, args).await
        }
        Commands::Whoami(args) => {
            let ctx = build_context()?;
            github_cmd::run_whoami(&ctx, args).await
        }
        Commands::Repos(args) => {
            let ctx = build_context()?;
            github_cmd::run_repos(&ctx, args).await
        }
    }
}

fn build_context() -> AppResult<AppContext> {
    let config = AppConfig::load()?;

    if config.github.token.is_none() {
        warn!("GitHub token not configured; pass --token or hosting calls will fail");
    }
    if config.language_model.api_key.is_none() {
        warn!("OpenAI API key not configured; changelog synthesis will fail");
    }

    let language_model: Arc<dyn LanguageModelService> = match &config.language_model.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(&config.language_model)?),
        LlmProvider::Custom(provider) => {
            warn!(
                provider = %provider,
                "custom LLM provider not supported, using the OpenAI-compatible client"
            );
            Arc::new(OpenAiClient::new(&config.language_model)?)
        }
    };
    let repository_host = Arc::new(GitHubClient::new(&config.github)?);
    let sessions = Arc::new(MemorySessionStore::new());

    let cache_drafts = config.cache_drafts;
    let mut context = AppContext::new(config, repository_host, language_model, sessions);
    if cache_drafts {
        let path = DraftCache::default_path()?;
        info!(path = %path.display(), "draft cache enabled");
        context = context.with_draft_cache(path);
    }

    Ok(context)
}
