use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for newsweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coordination: CoordinationConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
}

/// Which lease coordination backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinationBackend {
    /// In-process partitions, for a single worker process
    #[default]
    Local,
    /// Shared Redis sets, for a fleet of worker processes
    SharedStore,
}

/// Lease coordination configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoordinationConfig {
    #[serde(default)]
    pub backend: CoordinationBackend,

    /// Connection target of the shared store
    #[serde(default = "default_store_url")]
    pub store_url: String,

    /// Prefix for every key written to the shared store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Leases older than this are returned to pending (0 disables expiry)
    #[serde(default)]
    pub lease_timeout_secs: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            backend: CoordinationBackend::default(),
            store_url: default_store_url(),
            key_prefix: default_key_prefix(),
            lease_timeout_secs: 0,
        }
    }
}

/// Worker loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkerConfig {
    /// Stable worker identity; defaults to "crawler-<hostname>"
    #[serde(default)]
    pub server_name: Option<String>,

    /// Sources requested from the coordinator per acquire
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Sources processed concurrently by this process
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Pause between sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Pause when a batch comes back empty but other workers still hold leases
    #[serde(default = "default_poll_delay_secs")]
    pub poll_delay_secs: u64,

    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,

    /// Dereference each item link and extract its body text
    #[serde(default)]
    pub fetch_full_content: bool,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            server_name: None,
            batch_size: default_batch_size(),
            worker_threads: default_worker_threads(),
            sweep_interval_secs: default_sweep_interval_secs(),
            poll_delay_secs: default_poll_delay_secs(),
            max_items_per_source: default_max_items_per_source(),
            fetch_full_content: false,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    /// Sources listed in this file
    #[default]
    Static,
    /// Sources served by the news API
    Api,
}

/// Source catalog configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogConfig {
    #[serde(default)]
    pub kind: CatalogKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// A statically configured source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// Category hints and keyword rules
    #[default]
    Rules,
    /// Completion-style model endpoint
    Remote,
}

/// Category classifier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,

    /// Label used whenever classification fails
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,

    /// Upper bound on a single classification call
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,

    /// The valid category labels
    #[serde(default)]
    pub categories: Vec<String>,

    /// Keyword lists per category (rules classifier)
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            fallback_label: default_fallback_label(),
            timeout_secs: default_classifier_timeout_secs(),
            categories: Vec::new(),
            keywords: BTreeMap::new(),
            endpoint: None,
            model: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PublisherKind {
    /// Local SQLite database
    #[default]
    Sqlite,
    /// The news API
    Api,
}

/// Article publisher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PublisherConfig {
    #[serde(default)]
    pub kind: PublisherKind,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            kind: PublisherKind::default(),
            database_path: default_database_path(),
            endpoint: None,
            api_key: None,
        }
    }
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "crawler".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_worker_threads() -> usize {
    4
}

fn default_sweep_interval_secs() -> u64 {
    30 * 60
}

fn default_poll_delay_secs() -> u64 {
    5
}

fn default_max_items_per_source() -> usize {
    20
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_fallback_label() -> String {
    "uncategorized".to_string()
}

fn default_classifier_timeout_secs() -> u64 {
    10
}

fn default_database_path() -> String {
    "./articles.db".to_string()
}
