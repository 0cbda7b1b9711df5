//! Configuration module for newsweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use newsweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("newsweep.toml")).unwrap();
//! println!("Batch size: {}", config.worker.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CatalogConfig, CatalogKind, ClassifierConfig, ClassifierKind, Config, CoordinationBackend,
    CoordinationConfig, PublisherConfig, PublisherKind, SourceEntry, UserAgentConfig,
    WorkerConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

impl WorkerConfig {
    /// The stable identity this worker reports leases under
    ///
    /// Uses the configured server name, falling back to "crawler-<hostname>".
    pub fn worker_id(&self) -> String {
        if let Some(name) = self.server_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| format!("pid{}", std::process::id()));
        format!("crawler-{}", host)
    }
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
