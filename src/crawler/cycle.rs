//! Crawl cycle driver
//!
//! One cycle moves a frontier directory from cycle N to cycle N+1:
//!
//! ```text
//! pagedb ──schedule──► batch ──fetch──► results ──process──┐
//!    │                                                      ▼
//!    └──────────── carried pages ─────────────────────► pagedb.raw
//!                                                           │ trim
//!                                                           ▼
//!                                   pagedb ◄──promote── pagedb.next
//! ```
//!
//! `pagedb` is only replaced after `pagedb.next` closed cleanly, so an
//! interrupted cycle leaves the current frontier untouched.

use crate::config::Config;
use crate::crawler::scheduler::Scheduler;
use crate::distributed::Cluster;
use crate::page::Page;
use crate::policy::FrontierPolicy;
use crate::processor::{
    DocumentPipeline, FetchOutcome, FetchResultProcessor, FetchTransport, PipelineCommand,
    ProcessorOptions,
};
use crate::store::{OpenMode, PageSink, PageStore, StoreError, StoreOptions};
use crate::trimmer::{FrontierTrimmer, TrimReport};
use crate::{Result, RunFlag};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Current frontier
pub const CURRENT_DIR: &str = "pagedb";

/// Raw output of the cycle in progress
pub const RAW_DIR: &str = "pagedb.raw";

/// Trimmed frontier waiting to be promoted
pub const NEXT_DIR: &str = "pagedb.next";

/// Pages received from other nodes
pub const CATCHER_DIR: &str = "pagedb.caught";

/// Store locations inside a frontier directory
#[derive(Debug, Clone)]
pub struct FrontierDir {
    root: PathBuf,
}

impl FrontierDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current(&self) -> PathBuf {
        self.root.join(CURRENT_DIR)
    }

    pub fn raw(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    pub fn next(&self) -> PathBuf {
        self.root.join(NEXT_DIR)
    }

    pub fn catcher(&self) -> PathBuf {
        self.root.join(CATCHER_DIR)
    }

    /// Finishes a promotion cut short between removing `pagedb` and
    /// renaming `pagedb.next`
    ///
    /// Returns true if a promotion was completed.
    pub fn recover(&self) -> Result<bool> {
        let current = self.current();
        let next = PageStore::new(self.next());
        if !current.exists() && next.exists() {
            tracing::warn!("Completing interrupted promotion of {}", next.dir().display());
            fs::rename(next.dir(), &current)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Replaces the current store with the trimmed one
    fn promote(&self) -> Result<()> {
        let current = self.current();
        if current.exists() {
            fs::remove_dir_all(&current)?;
        }
        fs::rename(self.next(), &current)?;
        let raw = self.raw();
        if raw.exists() {
            fs::remove_dir_all(&raw)?;
        }
        Ok(())
    }
}

/// Summary of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Cycle number of the store the cycle started from
    pub cycle: u64,
    pub scheduled: u64,
    pub carried: u64,
    pub fetched: u64,
    pub failed: u64,
    pub discovery_pages: u64,
    pub trim: TrimReport,
    /// Size of the promoted store
    pub size: u64,
}

/// Runs crawl cycles over one frontier directory
pub struct CrawlCycle {
    dir: FrontierDir,
    store_options: StoreOptions,
    scheduler: Scheduler,
    transport: Arc<dyn FetchTransport>,
    pipeline: Arc<dyn DocumentPipeline>,
    processor: FetchResultProcessor,
    trimmer: FrontierTrimmer,
    cluster: Option<Arc<Cluster>>,
}

impl CrawlCycle {
    pub fn new(
        root: impl Into<PathBuf>,
        config: &Config,
        transport: Arc<dyn FetchTransport>,
        pipeline: Arc<dyn DocumentPipeline>,
    ) -> Self {
        let policy = Arc::new(FrontierPolicy::from_config(config));
        Self::with_policy(root, config, policy, transport, pipeline)
    }

    /// Like [`new`](Self::new) with a policy built by the caller
    pub fn with_policy(
        root: impl Into<PathBuf>,
        config: &Config,
        policy: Arc<FrontierPolicy>,
        transport: Arc<dyn FetchTransport>,
        pipeline: Arc<dyn DocumentPipeline>,
    ) -> Self {
        let processor = FetchResultProcessor::new(
            policy.clone(),
            pipeline.clone(),
            ProcessorOptions::from_config(config),
        );
        Self {
            dir: FrontierDir::new(root),
            store_options: StoreOptions {
                sort_chunk_pages: config.store.sort_chunk_pages,
            },
            scheduler: Scheduler::new(config.fetch.batch_size),
            transport,
            pipeline,
            processor,
            trimmer: FrontierTrimmer::new(policy),
            cluster: None,
        }
    }

    /// Shares the frontier with other nodes
    pub fn with_cluster(mut self, cluster: Arc<Cluster>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Makes stochastic admission reproducible
    pub fn with_trimmer_seed(mut self, seed: u64) -> Self {
        self.trimmer = self.trimmer.with_seed(seed);
        self
    }

    pub fn dir(&self) -> &FrontierDir {
        &self.dir
    }

    fn store(&self, path: PathBuf) -> PageStore {
        PageStore::with_options(path, self.store_options)
    }

    /// The current frontier store, closed
    pub fn current(&self) -> PageStore {
        self.store(self.dir.current())
    }

    /// Runs `cycles` cycles, stopping early if `run` is cleared
    ///
    /// The document pipeline is asked to optimize once at the end.
    pub async fn run(&self, cycles: u64, run: &RunFlag) -> Result<Vec<CycleReport>> {
        let mut reports = Vec::new();
        for _ in 0..cycles {
            if !run.is_running() {
                break;
            }
            reports.push(self.run_cycle(run).await?);
        }
        self.pipeline
            .apply_command(PipelineCommand::Optimize, None)
            .await?;
        Ok(reports)
    }

    /// Runs one full cycle
    pub async fn run_cycle(&self, run: &RunFlag) -> Result<CycleReport> {
        self.dir.recover()?;
        let current = self.current();
        if !current.exists() {
            return Err(StoreError::Missing(current.dir().to_path_buf()).into());
        }
        let cycle = current.cycle();
        let mut report = CycleReport {
            cycle,
            ..CycleReport::default()
        };
        tracing::info!(
            "Starting cycle {} on {} ({} pages)",
            cycle,
            self.dir.root().display(),
            current.size()
        );

        let raw = Arc::new(self.store(self.dir.raw()));
        raw.destroy()?;
        raw.set_same_cycle_as(&current)?;
        raw.open(OpenMode::write())?;

        let schedule = self.scheduler.schedule(&current, &raw, run)?;
        report.scheduled = schedule.batch.len() as u64;
        report.carried = schedule.carried;

        let results = self.fetch(schedule.batch).await?;
        report.fetched = results.len() as u64;
        report.failed = results
            .iter()
            .filter(|r| matches!(r.outcome, FetchOutcome::Failure { .. }))
            .count() as u64;

        report.discovery_pages = match &self.cluster {
            None => {
                let sink: Arc<dyn PageSink> = raw.clone();
                let discovered = self.processor.process(results, sink, run).await?;
                raw.close()?;
                discovered
            }
            Some(cluster) => {
                let shared = Arc::new(cluster.wrap(raw.clone())?);
                let sink: Arc<dyn PageSink> = shared.clone();
                let discovered = self.processor.process(results, sink, run).await?;
                cluster.sync(cycle).await?;
                shared.close()?;
                discovered
            }
        };

        let next = self.store(self.dir.next());
        next.destroy()?;
        next.set_next_cycle_of(&current)?;
        next.open(OpenMode::write())?;
        report.trim = self
            .trimmer
            .trim(&raw, &next, report.discovery_pages, run)?;
        next.close()?;
        report.size = next.size();

        self.dir.promote()?;
        tracing::info!(
            "Cycle {} done: {} fetched ({} failed), {} pages in cycle {}",
            cycle,
            report.fetched,
            report.failed,
            report.size,
            cycle + 1
        );
        Ok(report)
    }

    async fn fetch(&self, batch: Vec<Page>) -> Result<Vec<crate::processor::FetchResult>> {
        if batch.is_empty() {
            tracing::info!("Nothing to fetch this cycle");
            return Ok(Vec::new());
        }
        self.transport.fetch(batch).await
    }
}
