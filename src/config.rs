use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding one `.md` file per note plus `index.db`.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// `../data/notes` when it already exists (running from a subdirectory of
/// the project), otherwise `./data/notes`.
fn default_root() -> PathBuf {
    let sibling = PathBuf::from("../data/notes");
    if sibling.is_dir() {
        sibling
    } else {
        PathBuf::from("./data/notes")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Background tasks applying index updates.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Pending index updates held before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long shutdown waits for queued index updates.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_workers() -> usize {
    2
}
fn default_queue_capacity() -> usize {
    256
}
fn default_shutdown_grace_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Configuration used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Same as [`Config::minimal`] with the store rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let mut config = Self::minimal();
        config.store.root = root.into();
        config
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.store.root.as_os_str().is_empty() {
        anyhow::bail!("store.root must not be empty");
    }
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    if config.sync.workers == 0 {
        anyhow::bail!("sync.workers must be >= 1");
    }
    if config.sync.queue_capacity == 0 {
        anyhow::bail!("sync.queue_capacity must be >= 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, content: &str) -> PathBuf {
        let path = tmp.path().join("marko.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_full_config() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[store]
root = "/srv/notes"

[server]
bind = "0.0.0.0:9000"

[sync]
workers = 4
queue_capacity = 10
shutdown_grace_secs = 1

[log]
level = "debug"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.store.root, PathBuf::from("/srv/notes"));
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.sync.workers, 4);
        assert_eq!(cfg.sync.queue_capacity, 10);
        assert_eq!(cfg.sync.shutdown_grace_secs, 1);
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn test_sections_default() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[store]\nroot = \"notes\"\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.store.root, PathBuf::from("notes"));
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.sync.workers, 2);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[sync]\nworkers = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("sync.workers"));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[sync]\nqueue_capacity = 0\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/marko.example.toml");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.store.root, PathBuf::from("./data/notes"));
        assert_eq!(cfg.sync.workers, SyncConfig::default().workers);
    }

    #[test]
    fn test_missing_file_uses_minimal() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.sync.queue_capacity, 256);
        assert!(load_config(&tmp.path().join("absent.toml")).is_err());
    }
}
