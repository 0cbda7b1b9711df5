use crate::config::types::{
    CatalogConfig, CatalogKind, ClassifierConfig, ClassifierKind, Config, CoordinationBackend,
    CoordinationConfig, PublisherConfig, PublisherKind, UserAgentConfig, WorkerConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_coordination_config(&config.coordination)?;
    validate_worker_config(&config.worker)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_catalog_config(&config.catalog)?;
    validate_classifier_config(&config.classifier)?;
    validate_publisher_config(&config.publisher)?;
    Ok(())
}

fn validate_coordination_config(config: &CoordinationConfig) -> Result<(), ConfigError> {
    if config.key_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "key_prefix cannot be empty".to_string(),
        ));
    }

    if config.backend == CoordinationBackend::SharedStore {
        let url = Url::parse(&config.store_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid store_url: {}", e)))?;
        if url.scheme() != "redis" && url.scheme() != "rediss" {
            return Err(ConfigError::Validation(format!(
                "store_url must use the redis or rediss scheme, got '{}'",
                config.store_url
            )));
        }
    }

    Ok(())
}

fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    if config.worker_threads < 1 || config.worker_threads > 256 {
        return Err(ConfigError::Validation(format!(
            "worker_threads must be between 1 and 256, got {}",
            config.worker_threads
        )));
    }

    if config.max_items_per_source < 1 {
        return Err(ConfigError::Validation(
            "max_items_per_source must be >= 1".to_string(),
        ));
    }

    if config.poll_delay_secs < 1 {
        return Err(ConfigError::Validation(
            "poll_delay_secs must be >= 1".to_string(),
        ));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.kind == CatalogKind::Api {
        validate_endpoint("catalog.endpoint", config.endpoint.as_deref())?;
    }

    for entry in &config.sources {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have a name",
                entry.url
            )));
        }

        let url = Url::parse(&entry.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid source URL '{}': {}", entry.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Source URL '{}' must use the http or https scheme",
                entry.url
            )));
        }
    }

    Ok(())
}

fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    if config.fallback_label.trim().is_empty() {
        return Err(ConfigError::Validation(
            "fallback_label cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "classifier timeout_secs must be >= 1".to_string(),
        ));
    }

    for category in config.keywords.keys() {
        if !config
            .categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
        {
            return Err(ConfigError::Validation(format!(
                "Keyword rules reference unknown category '{}'",
                category
            )));
        }
    }

    if config.kind == ClassifierKind::Remote {
        validate_endpoint("classifier.endpoint", config.endpoint.as_deref())?;
        if config.categories.is_empty() {
            return Err(ConfigError::Validation(
                "remote classifier needs at least one category".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_publisher_config(config: &PublisherConfig) -> Result<(), ConfigError> {
    match config.kind {
        PublisherKind::Sqlite => {
            if config.database_path.is_empty() {
                return Err(ConfigError::Validation(
                    "database_path cannot be empty".to_string(),
                ));
            }
        }
        PublisherKind::Api => {
            validate_endpoint("publisher.endpoint", config.endpoint.as_deref())?;
        }
    }

    Ok(())
}

fn validate_endpoint(field: &str, endpoint: Option<&str>) -> Result<(), ConfigError> {
    let endpoint = endpoint
        .ok_or_else(|| ConfigError::Validation(format!("{} is required", field)))?;

    let url = Url::parse(endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} must use the http or https scheme",
            field
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
