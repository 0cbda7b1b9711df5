//! newsweep: a distributed feed crawler
//!
//! This crate lets a fleet of crawler processes sweep a shared set of RSS
//! sources. Sources are leased through a work coordinator (in-process or backed
//! by a shared Redis store), fetched and extracted by bounded-parallel
//! pipelines, classified, and handed to a publisher.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod coordination;
pub mod crawler;
pub mod publish;
pub mod state;

use thiserror::Error;

/// Main error type for newsweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Coordination error: {0}")]
    Coordination(#[from] coordination::CoordinationError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Classification error: {0}")]
    Classify(#[from] classify::ClassifyError),

    #[error("Publish error: {0}")]
    Publish(#[from] publish::PublishError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed parse error for {url}: {message}")]
    FeedParse { url: String, message: String },

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

/// Result type alias for newsweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use coordination::WorkCoordinator;
pub use state::{Article, CompletionRecord, LeaseRecord, Source, SourceState, SweepSummary};
