//! Server configuration
//!
//! Values come from built-in defaults, then an optional JSON file, then the
//! command line. The file may set any subset of fields.

use crate::recognizer::PoolStrategy;
use crate::utils::{Analyzer, StemLanguage, StemPipeline, WordList};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "clinrec";
const CONFIG_FILE: &str = "config.json";

/// How a connection is served after the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolMode {
    /// Many prefixed requests per connection, each answered by a blank-terminated batch
    #[default]
    Persistent,
    /// A single `<ignored>\t<text>` request, answered then closed
    OneShot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StemmingConfig {
    pub language: StemLanguage,
    /// Times the stemmer is applied to each token
    pub passes: usize,
}

impl Default for StemmingConfig {
    fn default() -> Self {
        Self {
            language: StemLanguage::French,
            passes: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub strategy: PoolStrategy,
    /// Number of engines; ignored by the shared strategy
    pub size: usize,
    pub borrow_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            strategy: PoolStrategy::Pooled,
            size: 2,
            borrow_timeout_ms: 5000,
        }
    }
}

impl PoolConfig {
    pub fn borrow_timeout(&self) -> Duration {
        Duration::from_millis(self.borrow_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Connections served at the same time
    pub max_workers: usize,
    /// Accepted connections allowed to wait for a worker
    pub backlog: usize,
    /// Idle workers exit after this long
    pub idle_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: 64,
            backlog: 32,
            idle_timeout_secs: 600,
        }
    }
}

impl WorkerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Everything the server needs to start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// 0 picks an ephemeral port
    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub dictionary: PathBuf,

    /// One term per line; the built-in French list when unset
    #[serde(default)]
    pub stopwords: Option<PathBuf>,

    /// One term per line; the built-in French list when unset
    #[serde(default)]
    pub termination_terms: Option<PathBuf>,

    #[serde(default)]
    pub stemming: StemmingConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub workers: WorkerConfig,

    #[serde(default)]
    pub protocol: ProtocolMode,

    /// Read/write timeout on client sockets, 0 disables it
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_client_timeout_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: 0,
            dictionary: PathBuf::new(),
            stopwords: None,
            termination_terms: None,
            stemming: StemmingConfig::default(),
            pool: PoolConfig::default(),
            workers: WorkerConfig::default(),
            protocol: ProtocolMode::default(),
            client_timeout_secs: default_client_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ServerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// The config at `path`, else the per-user config file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match get_config_path() {
            Some(default_path) if default_path.is_file() => Self::load(&default_path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool.size == 0 {
            bail!("pool.size must be at least 1");
        }
        if self.stemming.passes == 0 {
            bail!("stemming.passes must be at least 1");
        }
        if self.workers.max_workers == 0 {
            bail!("workers.max_workers must be at least 1");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn client_timeout(&self) -> Option<Duration> {
        (self.client_timeout_secs > 0).then(|| Duration::from_secs(self.client_timeout_secs))
    }

    /// Build the analyzer shared by indexing and matching
    pub fn analyzer(&self) -> Result<Analyzer> {
        let stopwords = match &self.stopwords {
            Some(path) => WordList::load(path).context("Failed to load stopwords")?,
            None => WordList::french_stopwords(),
        };
        let termination_terms = match &self.termination_terms {
            Some(path) => WordList::load(path).context("Failed to load termination terms")?,
            None => WordList::french_termination_terms(),
        };
        Ok(Analyzer::new(
            StemPipeline::for_language(self.stemming.language, self.stemming.passes),
            stopwords,
            termination_terms,
        ))
    }
}

/// Per-user config file location, if the platform has a config directory
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.pool.size, 2);
        assert_eq!(config.pool.strategy, PoolStrategy::Pooled);
        assert_eq!(config.stemming.passes, 2);
        assert_eq!(config.workers.idle_timeout(), Duration::from_secs(600));
        assert_eq!(config.protocol, ProtocolMode::Persistent);
        assert_eq!(config.client_timeout(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ServerConfig = serde_json::from_str(
            r#"{
                "port": 8890,
                "stemming": { "language": "english" },
                "pool": { "strategy": "shared" },
                "protocol": "one_shot"
            }"#,
        )
        .unwrap();

        assert_eq!(config.port, 8890);
        assert_eq!(config.stemming.language, StemLanguage::English);
        assert_eq!(config.stemming.passes, 2);
        assert_eq!(config.pool.strategy, PoolStrategy::Shared);
        assert_eq!(config.pool.borrow_timeout(), Duration::from_secs(5));
        assert_eq!(config.workers.max_workers, 64);
        assert_eq!(config.protocol, ProtocolMode::OneShot);
    }

    #[test]
    fn test_disabled_stemming_is_spelled_none() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "stemming": { "language": "none", "passes": 1 } }"#)
                .unwrap();
        assert_eq!(config.stemming.language, StemLanguage::Disabled);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = ServerConfig::default();
        config.pool.size = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.stemming.passes = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.workers.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_client_timeout_disables_it() {
        let config = ServerConfig {
            client_timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.client_timeout(), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bind_address": "127.0.0.1", "workers": {{ "backlog": 4 }} }}"#)
            .unwrap();

        let config = ServerConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.socket_addr(), "127.0.0.1:0".parse().unwrap());
        assert_eq!(config.workers.backlog, 4);
        assert_eq!(config.workers.max_workers, 64);
    }

    #[test]
    fn test_load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(ServerConfig::load(file.path()).is_err());
        assert!(ServerConfig::load(Path::new("/nonexistent/clinrec.json")).is_err());
    }

    #[test]
    fn test_analyzer_uses_configured_word_lists() {
        let mut stopwords = tempfile::NamedTempFile::new().unwrap();
        writeln!(stopwords, "avec").unwrap();

        let config = ServerConfig {
            stopwords: Some(stopwords.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let analyzer = config.analyzer().unwrap();
        assert!(analyzer.stopwords().contains("avec"));
        assert!(!analyzer.stopwords().contains("de"));
        // termination terms fall back to the built-in list
        assert!(analyzer.termination_terms().contains("mais"));
    }

    #[test]
    fn test_analyzer_reports_missing_word_list() {
        let config = ServerConfig {
            termination_terms: Some(PathBuf::from("/nonexistent/terms.txt")),
            ..ServerConfig::default()
        };
        assert!(config.analyzer().is_err());
    }
}
