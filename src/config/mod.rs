use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_EXPLORER_URL: &str = "https://api.etherscan.io";
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Values shipped in sample env files; treated the same as no key at all
const PLACEHOLDER_KEYS: &[&str] = &["YourEtherscanApiKey", "YourOpenAIApiKey"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EXPLORER_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub batch_size: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub batch_pause_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COMPLETION_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            batch_size: 10,
            max_retries: 3,
            initial_backoff_ms: 1000,
            batch_pause_ms: 500,
        }
    }
}

impl CompletionConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub explorer: ExplorerConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Explorer key after env override and placeholder filtering
    pub fn explorer_key(&self) -> Option<String> {
        credential(std::env::var("ETHERSCAN_API_KEY").ok(), self.explorer.api_key.as_deref())
    }

    /// Completion key after env override and placeholder filtering
    pub fn completion_key(&self) -> Option<String> {
        credential(std::env::var("OPENAI_API_KEY").ok(), self.completion.api_key.as_deref())
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        self.store
            .path
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("txmark.sqlite3")))
    }
}

/// The file a run actually reads: `--config` when given, else the default.
pub fn effective_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(config_path)
}

pub fn load_from(path: &Path) -> Config {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), "ignoring invalid config: {err}");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("TXMARK_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("txmark").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("txmark").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "txmark", "txmark")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("txmark"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("txmark"));
    }
    directories::ProjectDirs::from("io", "txmark", "txmark")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("txmark.log"))
}

/// Env wins over file; empty strings and sample placeholders mean "none"
fn credential(env: Option<String>, file: Option<&str>) -> Option<String> {
    env.into_iter()
        .chain(file.map(str::to_string))
        .map(|key| key.trim().to_string())
        .find(|key| is_real_key(key))
}

pub fn is_real_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.explorer.base_url, DEFAULT_EXPLORER_URL);
        assert_eq!(config.completion.batch_size, 10);
        assert_eq!(config.completion.max_retries, 3);
        assert_eq!(config.completion.initial_backoff(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [explorer]
            api_key = "abc"

            [completion]
            batch_size = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.explorer.api_key.as_deref(), Some("abc"));
        assert_eq!(config.explorer.base_url, DEFAULT_EXPLORER_URL);
        assert_eq!(config.completion.batch_size, 5);
        assert_eq!(config.completion.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_credential_filtering() {
        assert_eq!(credential(None, Some("YourEtherscanApiKey")), None);
        assert_eq!(credential(Some("  ".into()), None), None);
        assert_eq!(credential(Some("env".into()), Some("file")), Some("env".into()));
        assert_eq!(
            credential(Some("YourOpenAIApiKey".into()), Some("file")),
            Some("file".into())
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let explicit = Path::new("/tmp/other/txmark.toml");
        assert_eq!(
            effective_config_path(Some(explicit)),
            Some(explicit.to_path_buf())
        );
        assert_eq!(effective_config_path(None), config_path());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "explorer = [").unwrap();
        let config = load_from(&path);
        assert_eq!(config.explorer.base_url, DEFAULT_EXPLORER_URL);
    }
}
