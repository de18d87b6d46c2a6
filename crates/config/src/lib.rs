use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_conversation_path")]
    pub conversation_path: String,
}

impl BackendConfig {
    pub fn conversation_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.conversation_path.trim_start_matches('/')
        )
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            conversation_path: default_conversation_path(),
        }
    }
}

fn default_conversation_path() -> String {
    "/assistant/conversation".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Connect/response-header timeout. Streaming reads are not bounded.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl StreamingConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            debounce_ms: default_debounce_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_backoff_base_ms() -> u64 {
    1_000
}

const fn default_debounce_ms() -> u64 {
    16
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_csv_batch_size")]
    pub csv_batch_size: usize,
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_batch_size: default_csv_batch_size(),
            default_filename: default_filename(),
        }
    }
}

const fn default_csv_batch_size() -> usize {
    1_000
}

fn default_filename() -> String {
    "extraction_data.csv".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_cookie_name() -> String {
    "token".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            backend: BackendConfig::default(),
            streaming: StreamingConfig::default(),
            export: ExportConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("config.json"),
        }
    }

    pub fn from_default_location() -> Result<Self> {
        let mut dir = dirs::config_dir().context("failed to resolve config_dir")?;
        dir.push("infrahive-legal");
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            let config = AppConfig::default();
            self.save(&config)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut config: AppConfig =
            serde_json::from_str(&raw).context("failed to parse app config json")?;
        self.migrate(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let text = serde_json::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn migrate(&self, config: &mut AppConfig) {
        if config.schema_version >= CURRENT_SCHEMA_VERSION {
            return;
        }

        warn!(
            from = config.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating app config schema"
        );

        // v1 files had no export section and a zero batch size meant "unbounded".
        if config.export.csv_batch_size == 0 {
            config.export.csv_batch_size = default_csv_batch_size();
        }
        config.schema_version = CURRENT_SCHEMA_VERSION;
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn creates_default_config_when_missing() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::from_dir(dir.path());
        let config = store.load_or_init().expect("load default");
        assert_eq!(config.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(config.streaming.max_retries, 2);
        assert_eq!(config.export.default_filename, "extraction_data.csv");
        assert!(store.path().exists());
    }

    #[test]
    fn migrates_old_schema_and_fills_defaults() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::from_dir(dir.path());
        fs::write(
            store.path(),
            r#"{"schema_version":1,"backend":{"base_url":"https://legal.example.com/api/"},"export":{"csv_batch_size":0}}"#,
        )
        .expect("write old config");

        let config = store.load_or_init().expect("load migrated");
        assert_eq!(config.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(config.export.csv_batch_size, 1_000);
        assert_eq!(config.streaming.debounce_ms, 16);
        assert_eq!(
            config.backend.conversation_url(),
            "https://legal.example.com/api/assistant/conversation"
        );
    }
}
