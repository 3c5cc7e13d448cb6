use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::normalize::PatchBudget;
use crate::error::{AppError, AppResult};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
pub const DEFAULT_MAX_COMMITS: usize = 50;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 2000;

const CONFIG_DIR_NAME: &str = "logsmith";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github: GitHubSettings,
    pub language_model: LanguageModelSettings,
    pub pipeline: PipelineSettings,
    pub cache_drafts: bool,
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_base_url: String,
    /// Server-wide fallback used when the caller brings no token of their own.
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LanguageModelSettings {
    pub provider: LlmProvider,
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Custom(String),
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "openai" | "gpt" => LlmProvider::OpenAi,
            other => LlmProvider::Custom(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_commits: usize,
    pub patch_budget: PatchBudget,
}

/// The on-disk configuration file. Every field is optional; environment
/// variables override it and built-in defaults fill the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_commits: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_max_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_drafts: Option<bool>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        restrict_permissions(path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> AppResult<()> {
    Ok(())
}

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| {
            AppError::Configuration("could not determine the configuration directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Self::resolve(&stored, |key| env::var(key).ok())
    }

    /// Layers environment values over the stored file over defaults.
    pub fn resolve(stored: &StoredConfig, env: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let lookup = |key: &str| non_empty(env(key));

        let github = GitHubSettings {
            api_base_url: lookup("GITHUB_API_BASE_URL")
                .or_else(|| non_empty(stored.github_api_url.clone()))
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            token: lookup("GITHUB_TOKEN").or_else(|| non_empty(stored.github_token.clone())),
            timeout: DEFAULT_TIMEOUT,
        };

        let provider = lookup("LOGSMITH_LLM_PROVIDER")
            .or_else(|| non_empty(stored.llm_provider.clone()))
            .map(|value| LlmProvider::parse(&value))
            .unwrap_or(LlmProvider::OpenAi);

        let language_model = LanguageModelSettings {
            provider,
            api_base_url: lookup("OPENAI_API_BASE_URL")
                .or_else(|| non_empty(stored.openai_api_url.clone()))
                .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),
            api_key: lookup("OPENAI_API_KEY").or_else(|| non_empty(stored.openai_api_key.clone())),
            model: lookup("OPENAI_MODEL")
                .or_else(|| non_empty(stored.openai_model.clone()))
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        };

        let max_commits = match lookup("LOGSMITH_MAX_COMMITS") {
            Some(raw) => parse_value::<usize>("LOGSMITH_MAX_COMMITS", &raw)?,
            None => stored.max_commits.unwrap_or(DEFAULT_MAX_COMMITS),
        };
        let max_commits = validate_max_commits(max_commits)?;

        let patch_max_bytes = match lookup("LOGSMITH_PATCH_MAX_BYTES") {
            Some(raw) => parse_value::<usize>("LOGSMITH_PATCH_MAX_BYTES", &raw)?,
            None => stored
                .patch_max_bytes
                .unwrap_or(PatchBudget::default().max_bytes),
        };
        let patch_max_bytes = validate_patch_max_bytes(patch_max_bytes)?;

        let cache_drafts = match lookup("LOGSMITH_CACHE_DRAFTS") {
            Some(raw) => parse_flag("LOGSMITH_CACHE_DRAFTS", &raw)?,
            None => stored.cache_drafts.unwrap_or(false),
        };

        Ok(Self {
            github,
            language_model,
            pipeline: PipelineSettings {
                max_commits,
                patch_budget: PatchBudget::with_max_bytes(patch_max_bytes),
            },
            cache_drafts,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_max_commits(value: usize) -> AppResult<usize> {
    if value == 0 {
        return Err(AppError::Configuration(
            "max_commits must be at least 1".to_string(),
        ));
    }
    Ok(value)
}

pub fn validate_patch_max_bytes(value: usize) -> AppResult<usize> {
    if value < PatchBudget::MIN_BYTES {
        return Err(AppError::Configuration(format!(
            "patch budget must be at least {} bytes, got {value}",
            PatchBudget::MIN_BYTES
        )));
    }
    Ok(value)
}

pub fn parse_value<T: FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.parse::<T>()
        .map_err(|_| AppError::Configuration(format!("{key} has an invalid value '{raw}'")))
}

pub fn parse_flag(key: &str, raw: &str) -> AppResult<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Configuration(format!(
            "{key} must be true or false, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = AppConfig::resolve(&StoredConfig::default(), env_from(&[])).unwrap();
        assert_eq!(config.github.api_base_url, DEFAULT_GITHUB_API_URL);
        assert_eq!(config.github.token, None);
        assert_eq!(config.language_model.provider, LlmProvider::OpenAi);
        assert_eq!(config.language_model.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.language_model.timeout, Duration::from_secs(30));
        assert_eq!(config.pipeline.max_commits, DEFAULT_MAX_COMMITS);
        assert_eq!(config.pipeline.patch_budget, PatchBudget::default());
        assert!(!config.cache_drafts);
    }

    #[test]
    fn environment_overrides_stored_values() {
        let stored = StoredConfig {
            github_token: Some("from-file".to_string()),
            openai_model: Some("gpt-4o".to_string()),
            max_commits: Some(20),
            ..StoredConfig::default()
        };
        let env = env_from(&[("GITHUB_TOKEN", "from-env"), ("LOGSMITH_MAX_COMMITS", "5")]);
        let config = AppConfig::resolve(&stored, env).unwrap();

        assert_eq!(config.github.token.as_deref(), Some("from-env"));
        assert_eq!(config.language_model.model, "gpt-4o");
        assert_eq!(config.pipeline.max_commits, 5);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let stored = StoredConfig {
            openai_api_key: Some("   ".to_string()),
            ..StoredConfig::default()
        };
        let config = AppConfig::resolve(&stored, env_from(&[("GITHUB_TOKEN", "")])).unwrap();
        assert_eq!(config.github.token, None);
        assert_eq!(config.language_model.api_key, None);
    }

    #[test]
    fn rejects_invalid_numbers_and_limits() {
        let bad_number = AppConfig::resolve(
            &StoredConfig::default(),
            env_from(&[("LOGSMITH_MAX_COMMITS", "many")]),
        );
        assert!(matches!(bad_number, Err(AppError::Configuration(_))));

        let zero = StoredConfig {
            max_commits: Some(0),
            ..StoredConfig::default()
        };
        assert!(matches!(
            AppConfig::resolve(&zero, env_from(&[])),
            Err(AppError::Configuration(_))
        ));

        let tiny_budget = AppConfig::resolve(
            &StoredConfig::default(),
            env_from(&[("LOGSMITH_PATCH_MAX_BYTES", "10")]),
        );
        assert!(matches!(tiny_budget, Err(AppError::Configuration(_))));
    }

    #[test]
    fn configures_patch_budget_and_cache() {
        let env = env_from(&[
            ("LOGSMITH_PATCH_MAX_BYTES", "5000"),
            ("LOGSMITH_CACHE_DRAFTS", "yes"),
        ]);
        let config = AppConfig::resolve(&StoredConfig::default(), env).unwrap();
        assert_eq!(config.pipeline.patch_budget.max_bytes, 5000);
        assert_eq!(config.pipeline.patch_budget.head_lines, 10);
        assert!(config.cache_drafts);
    }

    #[test]
    fn parses_custom_provider() {
        let env = env_from(&[("LOGSMITH_LLM_PROVIDER", "Gemini")]);
        let config = AppConfig::resolve(&StoredConfig::default(), env).unwrap();
        assert_eq!(
            config.language_model.provider,
            LlmProvider::Custom("gemini".to_string())
        );
    }

    #[test]
    fn stored_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let stored = StoredConfig {
            github_token: Some("ghp_example".to_string()),
            max_commits: Some(25),
            cache_drafts: Some(true),
            ..StoredConfig::default()
        };

        stored.save_to(&path).unwrap();
        assert_eq!(StoredConfig::load_from(&path).unwrap(), stored);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = StoredConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, StoredConfig::default());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "max_commits = \"lots\"").unwrap();
        assert!(matches!(
            StoredConfig::load_from(&path),
            Err(AppError::Configuration(_))
        ));
    }
}
