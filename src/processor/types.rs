use crate::page::Page;
use crate::Result;
use async_trait::async_trait;
use std::fmt;

/// A link found on a fetched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outlink {
    pub url: String,
    pub anchor: String,
}

impl Outlink {
    pub fn new(url: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor: anchor.into(),
        }
    }
}

/// Content returned by a successful fetch
#[derive(Debug, Clone, Default)]
pub struct FetchedDocument {
    pub title: Option<String>,
    pub text: String,
    pub outlinks: Vec<Outlink>,
}

/// What happened when a page was fetched
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(FetchedDocument),
    Failure {
        /// Worth retrying next cycle (timeouts, 5xx, connection errors)
        recoverable: bool,
        reason: String,
    },
}

/// One page's fetch result; `page.last_attempt` carries the attempt time
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub page: Page,
    pub outcome: FetchOutcome,
}

impl FetchResult {
    pub fn success(page: Page, document: FetchedDocument) -> Self {
        Self {
            page,
            outcome: FetchOutcome::Success(document),
        }
    }

    pub fn failure(page: Page, recoverable: bool, reason: impl Into<String>) -> Self {
        Self {
            page,
            outcome: FetchOutcome::Failure {
                recoverable,
                reason: reason.into(),
            },
        }
    }
}

/// A document handed to the downstream pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub anchors: Vec<String>,
    /// Epoch milliseconds
    pub fetched_at: i64,
    pub hotspot: bool,
}

impl Document {
    /// A document carrying only its URL, used for deletion notices
    pub fn url_only(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            text: String::new(),
            anchors: Vec::new(),
            fetched_at: 0,
            hotspot: false,
        }
    }
}

/// Out-of-band signals for the downstream pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCommand {
    /// Remove a previously emitted document
    Delete,
    /// Compact whatever the pipeline stores
    Optimize,
}

impl PipelineCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Optimize => "optimize",
        }
    }
}

impl fmt::Display for PipelineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downstream indexing/tagging pipeline
#[async_trait]
pub trait DocumentPipeline: Send + Sync {
    async fn process(&self, doc: &Document) -> Result<()>;

    async fn apply_command(&self, command: PipelineCommand, doc: Option<&Document>) -> Result<()>;
}

/// Pipeline that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPipeline;

#[async_trait]
impl DocumentPipeline for NullPipeline {
    async fn process(&self, _doc: &Document) -> Result<()> {
        Ok(())
    }

    async fn apply_command(&self, _command: PipelineCommand, _doc: Option<&Document>) -> Result<()> {
        Ok(())
    }
}

/// Network fetch transport
///
/// Returns one result per page in the batch. An `Err` means the whole batch
/// could not be attempted.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    async fn fetch(&self, batch: Vec<Page>) -> Result<Vec<FetchResult>>;
}
