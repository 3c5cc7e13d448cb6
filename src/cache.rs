use std::fs;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::config::config_directory;
use crate::domain::changelog::ChangelogBody;
use crate::error::{AppError, AppResult};

const CACHE_FILE_NAME: &str = "draft_cache.json";
const CACHE_LIMIT: usize = 32;

#[derive(Default, Serialize, Deserialize)]
struct CacheFile {
    entries: Vec<CacheEntry>,
}

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    key: String,
    body: ChangelogBody,
}

/// Validated model output keyed by (model, prompt). Holds at most
/// `CACHE_LIMIT` entries, evicting the oldest first.
pub struct DraftCache {
    file_path: PathBuf,
    file: CacheFile,
}

impl DraftCache {
    pub fn default_path() -> AppResult<PathBuf> {
        Ok(config_directory()?.join(CACHE_FILE_NAME))
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let file = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str::<CacheFile>(&contents)
                .map_err(|err| AppError::Cache(format!("invalid cache file: {err}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(err) => return Err(AppError::Io(err)),
        };

        Ok(Self {
            file_path: path.to_path_buf(),
            file,
        })
    }

    pub fn get(&self, key: &str) -> Option<ChangelogBody> {
        self.file
            .entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.body.clone())
    }

    pub fn insert(&mut self, key: String, body: ChangelogBody) {
        self.file.entries.retain(|entry| entry.key != key);
        self.file.entries.push(CacheEntry { key, body });

        if self.file.entries.len() > CACHE_LIMIT {
            let overflow = self.file.entries.len() - CACHE_LIMIT;
            self.file.entries.drain(0..overflow);
        }
    }

    pub fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.file)
            .map_err(|err| AppError::Cache(format!("failed to write cache: {err}")))?;
        fs::write(&self.file_path, data)?;
        Ok(())
    }

    pub fn compute_key(model: &str, prompt: &str) -> String {
        let mut hasher = Hasher::new();
        hasher.update(model.as_bytes());
        hasher.update(&[0]);
        hasher.update(prompt.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}
