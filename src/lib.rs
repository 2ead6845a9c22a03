//! Zip-Ingest: a re-runnable archive ingestion pipeline
//!
//! This crate discovers archive links on a remote listing page, downloads each
//! archive once, and forwards every entry inside it to an output queue once,
//! using a key-value ledger to make the whole pipeline safe to re-run.

pub mod config;
pub mod crawler;
pub mod pipeline;
pub mod storage;

use thiserror::Error;

/// Main error type for Zip-Ingest operations
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Scratch file error: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed archive {name}: {source}")]
    Archive {
        name: String,
        source: zip::result::ZipError,
    },

    #[error("Cannot resolve link {link}: {source}")]
    InvalidLink {
        link: String,
        source: ::url::ParseError,
    },

    #[error("Link queue closed")]
    QueueClosed,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Worker failed {0}")]
    Link(Box<pipeline::LinkFailure>),
}

/// Coarse classification of an [`IngestError`], used by the coordinator's
/// failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Listing or archive fetch failed
    Transport,
    /// The ledger or output queue could not be reached
    Store,
    /// Scratch file creation, write or removal failed
    LocalStorage,
    /// The downloaded container could not be read
    MalformedArchive,
    /// Queue or task plumbing broke
    Internal,
}

impl IngestError {
    /// Returns the failure class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Http { .. } | Self::Status { .. } | Self::InvalidLink { .. } => {
                ErrorClass::Transport
            }
            Self::Store(_) => ErrorClass::Store,
            Self::Scratch(_) | Self::Io(_) => ErrorClass::LocalStorage,
            Self::Archive { .. } => ErrorClass::MalformedArchive,
            Self::Config(_) | Self::QueueClosed | Self::Task(_) => ErrorClass::Internal,
            Self::Link(failure) => failure.error.class(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Zip-Ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{Coordinator, RunOutcome, RunSummary};
pub use storage::{Ledger, MemoryStore, Namespace, RedisStore, Store};
