use crate::config::types::{
    Config, DistributedConfig, FetchConfig, FilterConfig, FrontierConfig, ProcessorConfig,
    StoreConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use std::net::SocketAddr;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_frontier_config(&config.frontier)?;
    validate_processor_config(&config.processor)?;
    validate_store_config(&config.store)?;
    validate_fetch_config(&config.fetch)?;
    validate_filter_config(&config.filter)?;
    if let Some(distributed) = &config.distributed {
        validate_distributed_config(distributed)?;
    }
    Ok(())
}

/// Validates frontier policy configuration
fn validate_frontier_config(config: &FrontierConfig) -> Result<(), ConfigError> {
    if config.max_retries.is_empty() {
        return Err(ConfigError::Validation(
            "max-retries must list at least one retry budget".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.similarity_threshold) {
        return Err(ConfigError::Validation(format!(
            "similarity-threshold must be between 0 and 1, got {}",
            config.similarity_threshold
        )));
    }

    for pattern in &config.hotspots {
        if pattern.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Hotspot pattern cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_processor_config(config: &ProcessorConfig) -> Result<(), ConfigError> {
    if !(config.workers_per_cpu > 0.0) {
        return Err(ConfigError::Validation(format!(
            "workers-per-cpu must be > 0, got {}",
            config.workers_per_cpu
        )));
    }

    if config.queue_size < 1 {
        return Err(ConfigError::Validation(
            "queue-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.sort_chunk_pages < 1 {
        return Err(ConfigError::Validation(
            "sort-chunk-pages must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    for pattern in &config.deny_domains {
        validate_domain_pattern(pattern)?;
    }
    Ok(())
}

/// Validates the node list: unique socket addresses, this node among them
fn validate_distributed_config(config: &DistributedConfig) -> Result<(), ConfigError> {
    if config.nodes.is_empty() {
        return Err(ConfigError::Validation(
            "distributed.nodes cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for node in &config.nodes {
        let addr: SocketAddr = node.parse().map_err(|_| {
            ConfigError::Validation(format!("Node '{}' is not a valid ip:port address", node))
        })?;
        if !seen.insert(addr) {
            return Err(ConfigError::Validation(format!(
                "Node '{}' is listed more than once",
                node
            )));
        }
    }

    let listen: SocketAddr = config.listen.parse().map_err(|_| {
        ConfigError::Validation(format!(
            "listen '{}' is not a valid ip:port address",
            config.listen
        ))
    })?;
    if !seen.contains(&listen) {
        return Err(ConfigError::Validation(format!(
            "listen '{}' must be one of distributed.nodes",
            config.listen
        )));
    }

    if config.sync_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "sync-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
pub fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)?;
    } else {
        validate_domain_string(pattern)?;
    }

    Ok(())
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
