//! Fetch result processing
//!
//! [`FetchResultProcessor`] consumes one cycle's fetch results and writes the
//! raw store the trimmer consolidates:
//! - Failed pages are retried or dropped according to the retry budget
//! - Successful documents go to the downstream pipeline
//! - Outlinks become child pages carrying a share of the parent's score
//!
//! Documents are processed on a bounded worker pool; see [`pool`].

pub mod pool;
mod types;

pub use pool::{worker_count, BoundedPool};
pub use types::{
    Document, DocumentPipeline, FetchOutcome, FetchResult, FetchTransport, FetchedDocument,
    NullPipeline, Outlink, PipelineCommand,
};

use crate::config::Config;
use crate::page::{now_millis, Page, Signature};
use crate::policy::FrontierPolicy;
use crate::store::PageSink;
use crate::{FrontierError, Result, RunFlag};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorOptions {
    pub workers_per_cpu: f64,
    pub queue_size: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            workers_per_cpu: 2.0,
            queue_size: 256,
        }
    }
}

impl ProcessorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers_per_cpu: config.processor.workers_per_cpu,
            queue_size: config.processor.queue_size,
        }
    }
}

/// Turns fetch results into next-cycle pages
#[derive(Clone)]
pub struct FetchResultProcessor {
    policy: Arc<FrontierPolicy>,
    pipeline: Arc<dyn DocumentPipeline>,
    options: ProcessorOptions,
}

impl FetchResultProcessor {
    pub fn new(
        policy: Arc<FrontierPolicy>,
        pipeline: Arc<dyn DocumentPipeline>,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            policy,
            pipeline,
            options,
        }
    }

    /// Processes a cycle's results into `sink`
    ///
    /// Returns the number of discovery pages (children beyond the hop limit)
    /// written, which the trimmer uses for its admission ratio. If `run` is
    /// cleared, jobs already submitted finish and `Interrupted` is returned.
    pub async fn process(
        &self,
        results: Vec<FetchResult>,
        sink: Arc<dyn PageSink>,
        run: &RunFlag,
    ) -> Result<u64> {
        let workers = worker_count(self.options.workers_per_cpu);
        let pool = BoundedPool::new(workers, self.options.queue_size);
        let discovered = Arc::new(AtomicU64::new(0));
        let total = results.len();
        let mut interrupted = false;

        tracing::info!("Processing {} fetch results on {} workers", total, workers);

        for result in results {
            if !run.is_running() {
                interrupted = true;
                break;
            }
            if pool.has_failed() {
                break;
            }

            let worker = self.clone();
            let sink = sink.clone();
            let counter = discovered.clone();
            pool.submit(Box::pin(async move {
                let found = worker.process_one(result, sink.as_ref()).await?;
                counter.fetch_add(found, Ordering::SeqCst);
                Ok(())
            }))
            .await;
        }

        pool.join().await?;
        if interrupted {
            tracing::warn!("Processing interrupted before all {} results were handled", total);
            return Err(FrontierError::Interrupted);
        }

        let discovered = discovered.load(Ordering::SeqCst);
        tracing::info!("Processed {} results, {} discovery pages", total, discovered);
        Ok(discovered)
    }

    /// Applies the success/failure policy to one result
    ///
    /// Returns the number of discovery pages produced.
    pub async fn process_one(&self, result: FetchResult, sink: &dyn PageSink) -> Result<u64> {
        let FetchResult { mut page, outcome } = result;
        if page.last_attempt == 0 {
            page.last_attempt = now_millis();
        }

        match outcome {
            FetchOutcome::Success(doc)
                if !(doc.text.trim().is_empty()
                    && doc.outlinks.is_empty()
                    && page.anchors.is_empty()) =>
            {
                self.on_success(page, doc, sink).await
            }
            FetchOutcome::Success(_) => {
                self.on_failure(page, true, "empty document", sink).await?;
                Ok(0)
            }
            FetchOutcome::Failure {
                recoverable,
                reason,
            } => {
                self.on_failure(page, recoverable, &reason, sink).await?;
                Ok(0)
            }
        }
    }

    async fn on_failure(
        &self,
        mut page: Page,
        recoverable: bool,
        reason: &str,
        sink: &dyn PageSink,
    ) -> Result<()> {
        if recoverable && !self.policy.too_many_retries(&page) {
            page.retries = page.retries.saturating_add(1);
            tracing::debug!(
                "Retrying {} later (attempt {}): {}",
                page.url,
                page.retries,
                reason
            );
            return sink.add_page(page).await;
        }

        tracing::debug!("Dropping {}: {}", page.url, reason);
        if page.emitted {
            let doc = Document::url_only(page.url.clone());
            self.pipeline
                .apply_command(PipelineCommand::Delete, Some(&doc))
                .await?;
        }
        Ok(())
    }

    async fn on_success(
        &self,
        mut page: Page,
        doc: FetchedDocument,
        sink: &dyn PageSink,
    ) -> Result<u64> {
        let policy = &self.policy;
        page.retries = 0;

        let signature = Signature::from_text(&doc.text);
        if page.last_success == 0 {
            page.last_change = page.last_attempt;
        } else if !page.signature.is_empty()
            && !page.signature.is_similar(&signature, policy.similarity_threshold)
        {
            tracing::trace!("Content of {} changed", page.url);
            page.last_change = page.last_attempt;
        }
        page.signature = signature;
        page.last_success = page.last_attempt;

        let hotspot = policy.is_hotspot(&page.url);
        let document = Document {
            url: page.url.clone(),
            title: doc.title.clone(),
            text: doc.text.clone(),
            anchors: page.anchors.iter().cloned().collect(),
            fetched_at: page.last_attempt,
            hotspot,
        };
        self.pipeline.process(&document).await?;
        page.emitted = true;

        let mut outlinks = doc.outlinks;
        if outlinks.is_empty() {
            // A dangling page links to itself so its score is not lost
            outlinks.push(Outlink::new(page.url.clone(), ""));
        }

        let past_boundary = page.distance > policy.max_distance;
        let share = page.score / outlinks.len() as f64;
        let mut discovered = 0u64;

        for link in outlinks {
            let Some(url) = policy.filter_url(&link.url) else {
                tracing::trace!("Skipping outlink {}: rejected by url filter", link.url);
                continue;
            };
            if past_boundary && url == page.url {
                continue;
            }

            let mut child = Page::new(url);
            if policy.track_parents {
                child.add_parent(&page.url);
            }
            child.add_anchor(&link.anchor);
            child.score = share;
            child.distance = self.child_distance(&page, &child.url);

            if child.distance > policy.max_distance {
                discovered += 1;
            }
            sink.add_page(child).await?;
        }

        page.distance = if hotspot {
            0
        } else {
            policy.rediscovery_distance()
        };
        sink.add_page(page).await?;
        Ok(discovered)
    }

    fn child_distance(&self, parent: &Page, child_url: &str) -> u32 {
        let policy = &self.policy;
        if policy.restrict_to_hotspots && policy.max_distance == 0 {
            if policy.is_hotspot(child_url) {
                0
            } else {
                policy.rediscovery_distance()
            }
        } else {
            parent.distance.saturating_add(1)
        }
    }
}
