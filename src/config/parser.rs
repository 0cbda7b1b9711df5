use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use newsweep::config::load_config;
///
/// let config = load_config(Path::new("newsweep.toml")).unwrap();
/// println!("Worker threads: {}", config.worker.worker_threads);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup and stored with sweep summaries so a fleet
/// running mixed configurations is visible.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogKind, ClassifierKind, CoordinationBackend, PublisherKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const USER_AGENT: &str = r#"
[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#;

    #[test]
    fn test_load_valid_config() {
        let config_content = format!(
            r#"
[coordination]
backend = "shared-store"
store-url = "redis://cache.internal:6379"
key-prefix = "fleet"
lease-timeout-secs = 900

[worker]
server-name = "crawler-a"
batch-size = 10
worker-threads = 8
fetch-full-content = true
{USER_AGENT}
[[catalog.sources]]
name = "Example"
url = "https://example.com/rss"
categories = ["World"]

[classifier]
categories = ["world", "technology"]
[classifier.keywords]
technology = ["software"]
"#
        );

        let file = create_temp_config(&config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.coordination.backend, CoordinationBackend::SharedStore);
        assert_eq!(config.coordination.key_prefix, "fleet");
        assert_eq!(config.coordination.lease_timeout_secs, 900);
        assert_eq!(config.worker.batch_size, 10);
        assert_eq!(config.worker.worker_threads, 8);
        assert!(config.worker.fetch_full_content);
        assert_eq!(config.worker.worker_id(), "crawler-a");
        assert_eq!(config.catalog.kind, CatalogKind::Static);
        assert_eq!(config.catalog.sources.len(), 1);
        assert_eq!(config.classifier.kind, ClassifierKind::Rules);
        assert_eq!(config.classifier.keywords["technology"], vec!["software"]);
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(USER_AGENT).unwrap();

        assert_eq!(config.coordination.backend, CoordinationBackend::Local);
        assert_eq!(config.worker.batch_size, 5);
        assert_eq!(config.worker.worker_threads, 4);
        assert_eq!(config.worker.poll_delay_secs, 5);
        assert_eq!(config.worker.max_items_per_source, 20);
        assert!(!config.worker.fetch_full_content);
        assert_eq!(config.classifier.fallback_label, "uncategorized");
        assert_eq!(config.publisher.kind, PublisherKind::Sqlite);
    }

    #[test]
    fn test_worker_id_falls_back_to_hostname() {
        let config = parse_config(USER_AGENT).unwrap();
        assert!(config.worker.worker_id().starts_with("crawler-"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/newsweep.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = format!("[worker]\nbatch-size = 0\n{USER_AGENT}");

        let file = create_temp_config(&config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let config_content = format!("[coordination]\nbackend = \"database\"\n{USER_AGENT}");
        assert!(matches!(
            parse_config(&config_content),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
