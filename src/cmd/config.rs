use std::fmt::Display;
use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{
    StoredConfig, config_file_path, parse_flag, parse_value, validate_max_commits,
    validate_patch_max_bytes,
};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring logsmith.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    apply_prompt("GitHub token", &mut cfg.github_token, true)?;
    apply_prompt(
        "GitHub API URL (e.g., https://api.github.com)",
        &mut cfg.github_api_url,
        false,
    )?;

    apply_prompt("LLM provider (openai/custom)", &mut cfg.llm_provider, false)?;
    apply_prompt("OpenAI API key", &mut cfg.openai_api_key, true)?;
    apply_prompt("OpenAI model", &mut cfg.openai_model, false)?;
    apply_prompt(
        "OpenAI-compatible API URL (e.g., https://api.openai.com/v1)",
        &mut cfg.openai_api_url,
        false,
    )?;

    apply_parsed(
        "Maximum commits per run",
        &mut cfg.max_commits,
        parse_max_commits,
    )?;
    apply_parsed(
        "Patch budget in bytes",
        &mut cfg.patch_max_bytes,
        parse_patch_max_bytes,
    )?;
    apply_parsed(
        "Cache drafts (yes/no)",
        &mut cfg.cache_drafts,
        parse_cache_drafts,
    )?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("GitHub token: {}", mask_secret(&cfg.github_token));
    println!("GitHub API URL: {}", display_value(&cfg.github_api_url));
    println!("LLM provider: {}", display_value(&cfg.llm_provider));
    println!("OpenAI API key: {}", mask_secret(&cfg.openai_api_key));
    println!("OpenAI model: {}", display_value(&cfg.openai_model));
    println!("OpenAI API URL: {}", display_value(&cfg.openai_api_url));
    println!("Max commits: {}", display_value(&cfg.max_commits));
    println!("Patch budget: {}", display_value(&cfg.patch_max_bytes));
    println!("Cache drafts: {}", display_value(&cfg.cache_drafts));

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn apply_parsed<T>(
    field: &str,
    target: &mut Option<T>,
    parse: impl Fn(&str) -> AppResult<T>,
) -> AppResult<()>
where
    T: Display,
{
    let current = target.as_ref().map(ToString::to_string);
    let action = prompt(field, current.as_deref(), false)?;
    apply_action(target, action, parse)
}

fn apply_action<T>(
    target: &mut Option<T>,
    action: PromptAction,
    parse: impl Fn(&str) -> AppResult<T>,
) -> AppResult<()> {
    match action {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(parse(&value)?),
    }
    Ok(())
}

fn parse_max_commits(raw: &str) -> AppResult<usize> {
    parse_value::<usize>("max_commits", raw).and_then(validate_max_commits)
}

fn parse_patch_max_bytes(raw: &str) -> AppResult<usize> {
    parse_value::<usize>("patch_max_bytes", raw).and_then(validate_patch_max_bytes)
}

fn parse_cache_drafts(raw: &str) -> AppResult<bool> {
    parse_flag("cache_drafts", raw)
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(PromptAction::from_input(&input))
}

fn display_value<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let prefix: String = token.chars().take(3).collect();
            let suffix: String = token
                .chars()
                .rev()
                .take(3)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn from_input(input: &str) -> Self {
        match input.trim() {
            "" => PromptAction::Keep,
            "-" => PromptAction::Clear,
            value => PromptAction::Set(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn interprets_wizard_input() {
        assert_eq!(PromptAction::from_input("\n"), PromptAction::Keep);
        assert_eq!(PromptAction::from_input(" - \n"), PromptAction::Clear);
        assert_eq!(
            PromptAction::from_input("gpt-4o\n"),
            PromptAction::Set("gpt-4o".to_string())
        );
    }

    #[test]
    fn wizard_numbers_follow_config_limits() {
        let mut max_commits = Some(50);
        let zero = apply_action(
            &mut max_commits,
            PromptAction::Set("0".to_string()),
            parse_max_commits,
        );
        assert!(matches!(zero, Err(AppError::Configuration(_))));
        assert_eq!(max_commits, Some(50));

        apply_action(&mut max_commits, PromptAction::Set("25".to_string()), parse_max_commits)
            .unwrap();
        assert_eq!(max_commits, Some(25));

        let mut patch_max_bytes = None;
        let tiny = apply_action(
            &mut patch_max_bytes,
            PromptAction::Set("10".to_string()),
            parse_patch_max_bytes,
        );
        assert!(tiny.is_err());
        assert_eq!(patch_max_bytes, None);

        apply_action(&mut patch_max_bytes, PromptAction::Clear, parse_patch_max_bytes).unwrap();
        assert_eq!(patch_max_bytes, None);
    }

    #[test]
    fn wizard_flags_accept_config_spellings() {
        let mut cache_drafts = None;
        for (input, expected) in [("yes", true), ("on", true), ("1", true), ("off", false)] {
            apply_action(
                &mut cache_drafts,
                PromptAction::Set(input.to_string()),
                parse_cache_drafts,
            )
            .unwrap();
            assert_eq!(cache_drafts, Some(expected));
        }

        let maybe = apply_action(
            &mut cache_drafts,
            PromptAction::Set("maybe".to_string()),
            parse_cache_drafts,
        );
        assert!(maybe.is_err());
        assert_eq!(cache_drafts, Some(false));
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret(&Some("ghp_abcdef123".to_string())), "ghp***123");
        assert_eq!(mask_secret(&Some("short".to_string())), "***");
        assert_eq!(mask_secret(&None), "<not set>");
    }

    #[test]
    fn displays_optional_values() {
        assert_eq!(display_value(&Some(25usize)), "25");
        assert_eq!(display_value(&Some(String::new())), "<not set>");
        assert_eq!(display_value::<bool>(&None), "<not set>");
    }
}
