use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Zip-Ingest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listing: ListingConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Where archive links are discovered and how they are recognised
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// URL of the HTML listing page; also the base for relative links
    pub url: String,

    /// Suffix a link must end with to be treated as an archive
    #[serde(rename = "archive-suffix", default = "default_archive_suffix")]
    pub archive_suffix: String,

    /// Links shorter than this are dropped before the suffix check
    #[serde(rename = "min-link-length", default = "default_min_link_length")]
    pub min_link_length: usize,
}

/// Download worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent download workers
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// Capacity of the link hand-off queue between crawler and workers
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Directory for scratch archive files (defaults to the OS temp dir)
    #[serde(rename = "scratch-dir", default)]
    pub scratch_dir: Option<PathBuf>,

    /// What to do when a worker reports a failure for one link
    #[serde(rename = "on-error", default)]
    pub on_error: FailurePolicy,

    /// Wait for queued links to finish once the listing is exhausted
    #[serde(rename = "drain-on-complete", default = "default_true")]
    pub drain_on_complete: bool,
}

/// Policy applied to per-link worker failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run on the first failure
    #[default]
    Halt,
    /// Log the failure, leave the link unmarked and keep going
    Skip,
}

/// Key-value store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379`
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Hash holding the "archive downloaded" markers
    #[serde(rename = "downloaded-key", default = "default_downloaded_key")]
    pub downloaded_key: String,

    /// Hash holding the "entry processed" markers
    #[serde(rename = "processed-key", default = "default_processed_key")]
    pub processed_key: String,

    /// List that records are pushed onto
    #[serde(default = "default_queue")]
    pub queue: String,

    /// Send PING when a worker takes its connection
    #[serde(rename = "ping-on-connect", default = "default_true")]
    pub ping_on_connect: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl Config {
    /// Creates a configuration for the given listing URL with every other
    /// section at its defaults
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            listing: ListingConfig::new(listing_url),
            workers: WorkerConfig::default(),
            redis: RedisConfig::default(),
            user_agent: UserAgentConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            scratch_dir: None,
            on_error: FailurePolicy::default(),
            drain_on_complete: true,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            downloaded_key: default_downloaded_key(),
            processed_key: default_processed_key(),
            queue: default_queue(),
            ping_on_connect: true,
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

impl ListingConfig {
    /// Creates a listing config with default filters for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            archive_suffix: default_archive_suffix(),
            min_link_length: default_min_link_length(),
        }
    }
}

fn default_archive_suffix() -> String {
    ".zip".to_string()
}

fn default_min_link_length() -> usize {
    "http://".len()
}

fn default_worker_count() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    1
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_downloaded_key() -> String {
    "zips".to_string()
}

fn default_processed_key() -> String {
    "xmls".to_string()
}

fn default_queue() -> String {
    "NEWS_XML".to_string()
}

fn default_crawler_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_true() -> bool {
    true
}
