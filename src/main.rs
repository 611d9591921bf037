//! Ripple-Frontier main entry point
//!
//! This is the command-line interface for the ripple-frontier crawl frontier.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ripple_frontier::config::{load_config_with_hash, Config};
use ripple_frontier::crawler::{self, CrawlCycle, FrontierDir, HttpFetcher};
use ripple_frontier::distributed::Cluster;
use ripple_frontier::output::{format_page_line, print_store_stats, SqliteDocumentSink};
use ripple_frontier::processor::{DocumentPipeline, NullPipeline};
use ripple_frontier::store::{OpenMode, PageStore, StoreOptions};
use ripple_frontier::{FrontierPolicy, FrontierTrimmer, RunFlag};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ripple-Frontier: a disk-resident crawl frontier
///
/// Keeps the set of known pages with their fetch history, scores and link
/// graph, and consolidates each crawl cycle's results into the next cycle.
#[derive(Parser, Debug)]
#[command(name = "ripple-frontier")]
#[command(version)]
#[command(about = "A disk-resident crawl frontier engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty store
    Create { dir: PathBuf },

    /// Seed a store from a newline-delimited URL file
    Append { dir: PathBuf, urls: PathBuf },

    /// List the pages of a store in hash order
    List {
        dir: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a store's statistics
    Stats { dir: PathBuf },

    /// Write the union of two stores into a third
    Merge { a: PathBuf, b: PathBuf, dest: PathBuf },

    /// Recover a store after an interrupted write
    Repair { dir: PathBuf },

    /// Consolidate a raw store into a next-cycle store
    Trim {
        origin: PathBuf,
        dest: PathBuf,
        /// Discovery candidates produced in the cycle
        #[arg(long, default_value_t = 0)]
        discovery_pages: u64,
    },

    /// Copy a store, clearing fetch history but keeping the link graph
    Reset { src: PathBuf, dest: PathBuf },

    /// Copy a store
    Copy { src: PathBuf, dest: PathBuf },

    /// Run crawl cycles on a frontier directory
    Crawl {
        /// Directory holding `pagedb`
        dir: PathBuf,
        #[arg(long, default_value_t = 1)]
        cycles: u64,
        /// Write fetched documents to this SQLite database
        #[arg(long, value_name = "PATH")]
        sqlite: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    let run = RunFlag::new();
    let interrupt = run.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current work");
            interrupt.stop();
        }
    });

    match execute(cli.command, &config, &run).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("{:#}", e);
            Err(e)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_frontier=info,warn"),
            1 => EnvFilter::new("ripple_frontier=debug,info"),
            2 => EnvFilter::new("ripple_frontier=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

async fn execute(command: Command, config: &Config, run: &RunFlag) -> anyhow::Result<()> {
    let options = StoreOptions {
        sort_chunk_pages: config.store.sort_chunk_pages,
    };
    let store = |dir: &Path| PageStore::with_options(dir, options);

    match command {
        Command::Create { dir } => {
            crawler::create_store(&store(&dir))?;
            println!("✓ Created {}", dir.display());
        }
        Command::Append { dir, urls } => {
            let seeds = crawler::read_seed_file(&urls)
                .with_context(|| format!("reading {}", urls.display()))?;
            let policy = FrontierPolicy::from_config(config);
            let report = crawler::append_seeds(&store(&dir), &seeds, &policy)?;
            println!(
                "✓ Added {} seeds ({} duplicates, {} rejected)",
                report.added, report.duplicates, report.rejected
            );
        }
        Command::List { dir, limit } => {
            let db = store(&dir);
            db.open(OpenMode::Read)?;
            for page in db.iter()?.take(limit.unwrap_or(usize::MAX)) {
                println!("{}", format_page_line(&page?));
            }
            db.close()?;
        }
        Command::Stats { dir } => {
            let db = store(&dir);
            db.open(OpenMode::Read)?;
            print_store_stats(&dir, &db.stats());
            db.close()?;
        }
        Command::Merge { a, b, dest } => {
            PageStore::merge(&store(&a), &store(&b), &store(&dest))?;
            println!("✓ Merged into {}", dest.display());
        }
        Command::Repair { dir } => {
            let outcome = store(&dir).repair()?;
            println!("✓ Repaired {}: {:?}", dir.display(), outcome);
        }
        Command::Trim {
            origin,
            dest,
            discovery_pages,
        } => {
            let origin = store(&origin);
            let dest = store(&dest);
            if !origin.exists() {
                bail!("no closed store in {}", origin.dir().display());
            }
            dest.ensure_distinct(&origin)?;
            dest.destroy()?;
            dest.set_next_cycle_of(&origin)?;
            dest.open(OpenMode::write())?;
            let trimmer = FrontierTrimmer::new(Arc::new(FrontierPolicy::from_config(config)));
            let report = trimmer.trim(&origin, &dest, discovery_pages, run)?;
            dest.close()?;
            println!(
                "✓ Trimmed {} records into {} pages ({} rejected)",
                report.read, report.written, report.rejected
            );
        }
        Command::Reset { src, dest } => {
            let written = crawler::reset_store(&store(&src), &store(&dest), run)?;
            println!("✓ Reset {} pages into {}", written, dest.display());
        }
        Command::Copy { src, dest } => {
            let written = crawler::copy_store(&store(&src), &store(&dest), run)?;
            println!("✓ Copied {} pages into {}", written, dest.display());
        }
        Command::Crawl {
            dir,
            cycles,
            sqlite,
        } => crawl(&dir, cycles, sqlite.as_deref(), config, run).await?,
    }
    Ok(())
}

/// Handles the crawl command
async fn crawl(
    dir: &Path,
    cycles: u64,
    sqlite: Option<&Path>,
    config: &Config,
    run: &RunFlag,
) -> anyhow::Result<()> {
    let frontier = FrontierDir::new(dir);
    frontier.recover()?;
    if !PageStore::new(frontier.current()).exists() {
        bail!(
            "no frontier in {} (create and seed {} first)",
            dir.display(),
            frontier.current().display()
        );
    }

    let pipeline: Arc<dyn DocumentPipeline> = match sqlite {
        Some(path) => Arc::new(SqliteDocumentSink::open(path)?),
        None => Arc::new(NullPipeline),
    };
    let transport = Arc::new(HttpFetcher::new(&config.fetch)?);
    let mut driver = CrawlCycle::new(dir, config, transport, pipeline);

    // The server handle must outlive the cycles
    let mut node = None;
    if let Some(distributed) = &config.distributed {
        let (cluster, handle) = Cluster::bind(distributed, frontier.catcher()).await?;
        let cluster = Arc::new(cluster);
        tracing::info!(
            "Node {} joined a cluster of {}",
            cluster.me(),
            cluster.nodes().len()
        );
        driver = driver.with_cluster(cluster.clone());
        node = Some((cluster, handle));
    }

    let result = driver.run(cycles, run).await;
    if let Some((cluster, handle)) = node {
        handle.shutdown();
        cluster.shutdown()?;
    }

    let reports = result?;
    for report in &reports {
        println!(
            "Cycle {}: scheduled {}, failed {}, discovery pages {}, {} pages next",
            report.cycle, report.scheduled, report.failed, report.discovery_pages, report.size
        );
    }
    println!("✓ Ran {} of {} cycles", reports.len(), cycles);
    Ok(())
}
