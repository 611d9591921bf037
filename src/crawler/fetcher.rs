//! HTTP fetch transport
//!
//! This module handles all HTTP requests for the crawl cycle, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Fetching a batch concurrently, bounded by a semaphore
//! - Classifying failures as recoverable or not
//! - Parsing HTML bodies into documents

use crate::config::FetchConfig;
use crate::crawler::parser::parse_html;
use crate::page::{now_millis, Page};
use crate::processor::{FetchOutcome, FetchResult, FetchTransport, FetchedDocument};
use crate::{FrontierError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use ripple_frontier::config::FetchConfig;
/// use ripple_frontier::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> std::result::Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.timeout_secs);
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// How an HTTP status code is handled
///
/// | Status | Outcome |
/// |--------|---------|
/// | 2xx | parsed |
/// | 408, 429 | recoverable failure |
/// | other 4xx | permanent failure |
/// | 5xx | recoverable failure |
///
/// Returns `None` for success, otherwise whether the failure is recoverable.
pub fn classify_status(status: StatusCode) -> Option<bool> {
    if status.is_success() {
        None
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS {
        Some(true)
    } else if status.is_client_error() {
        Some(false)
    } else {
        Some(status.is_server_error())
    }
}

/// Fetches one URL and parses it
pub async fn fetch_url(client: &Client, url: &str) -> FetchOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return network_failure(&e),
    };

    let status = response.status();
    if let Some(recoverable) = classify_status(status) {
        return FetchOutcome::Failure {
            recoverable,
            reason: format!("HTTP {}", status.as_u16()),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    let final_url = response.url().clone();

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return network_failure(&e),
    };

    if content_type.is_empty() || content_type.contains("html") {
        FetchOutcome::Success(parse_html(&body, &final_url))
    } else if content_type.starts_with("text/") {
        FetchOutcome::Success(FetchedDocument {
            title: None,
            text: body.split_whitespace().collect::<Vec<_>>().join(" "),
            outlinks: Vec::new(),
        })
    } else {
        FetchOutcome::Failure {
            recoverable: false,
            reason: format!("unsupported content type {}", content_type),
        }
    }
}

fn network_failure(e: &reqwest::Error) -> FetchOutcome {
    // Classify error
    let (recoverable, reason) = if e.is_timeout() {
        (true, "request timeout".to_string())
    } else if e.is_connect() {
        (true, "connection failed".to_string())
    } else if e.is_builder() {
        (false, format!("invalid request: {}", e))
    } else {
        (true, e.to_string())
    };
    FetchOutcome::Failure {
        recoverable,
        reason,
    }
}

/// Default [`FetchTransport`] over HTTP(S)
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    permits: Arc<Semaphore>,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = build_http_client(config)
            .map_err(|e| FrontierError::Fetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config.max_concurrent))
    }

    pub fn with_client(client: Client, max_concurrent: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl FetchTransport for HttpFetcher {
    async fn fetch(&self, batch: Vec<Page>) -> Result<Vec<FetchResult>> {
        let total = batch.len();
        let mut tasks = JoinSet::new();

        for mut page in batch {
            let client = self.client.clone();
            let permits = self.permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                page.last_attempt = now_millis();
                let outcome = fetch_url(&client, &page.url).await;
                match &outcome {
                    FetchOutcome::Success(doc) => tracing::debug!(
                        "Fetched {} ({} outlinks)",
                        page.url,
                        doc.outlinks.len()
                    ),
                    FetchOutcome::Failure { reason, .. } => {
                        tracing::debug!("Fetch of {} failed: {}", page.url, reason)
                    }
                }
                FetchResult { page, outcome }
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let result =
                joined.map_err(|e| FrontierError::Fetch(format!("fetch task failed: {}", e)))?;
            results.push(result);
        }

        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, FetchOutcome::Failure { .. }))
            .count();
        tracing::info!("Fetched batch of {}: {} failed", total, failed);
        Ok(results)
    }
}
