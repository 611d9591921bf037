use serde::Deserialize;

/// Main configuration structure for Ripple-Frontier
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub frontier: FrontierConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub distributed: Option<DistributedConfig>,
}

/// Admission and retry policy for the frontier
#[derive(Debug, Clone, Deserialize)]
pub struct FrontierConfig {
    /// Hop limit from the nearest hotspot
    #[serde(rename = "max-distance", default = "default_max_distance")]
    pub max_distance: u32,

    /// Retry budget per distance; index is the distance
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: Vec<u32>,

    /// Cap on pages written per trim, 0 = unlimited
    #[serde(rename = "max-size", default)]
    pub max_size: u64,

    /// URL glob patterns defining hotspots; "*" matches everything
    #[serde(default = "default_hotspots")]
    pub hotspots: Vec<String>,

    /// Pin hotspot children to distance 0 when max-distance is 0
    #[serde(rename = "restrict-to-hotspots", default)]
    pub restrict_to_hotspots: bool,

    /// Record inlinking URLs on each page
    #[serde(rename = "track-parents", default)]
    pub track_parents: bool,

    /// Signature similarity at or above which content counts as unchanged
    #[serde(
        rename = "similarity-threshold",
        default = "default_similarity_threshold"
    )]
    pub similarity_threshold: f64,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            max_distance: default_max_distance(),
            max_retries: default_max_retries(),
            max_size: 0,
            hotspots: default_hotspots(),
            restrict_to_hotspots: false,
            track_parents: false,
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Discovery front: how many pages beyond max-distance join each cycle
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DiscoveryConfig {
    /// Per-cycle quota of discovery pages, 0 disables the front
    #[serde(rename = "front-size", default)]
    pub front_size: u64,

    /// Admit candidates randomly instead of first-come
    #[serde(default)]
    pub stochastic: bool,

    /// Cycles between discovery waves, 0 = no waves
    #[serde(rename = "wave-period", default)]
    pub wave_period: u64,
}

/// Fetch result processing
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    #[serde(rename = "workers-per-cpu", default = "default_workers_per_cpu")]
    pub workers_per_cpu: f64,

    /// Bounded job queue length before the caller runs jobs itself
    #[serde(rename = "queue-size", default = "default_queue_size")]
    pub queue_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            workers_per_cpu: default_workers_per_cpu(),
            queue_size: default_queue_size(),
        }
    }
}

/// Page store tuning
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "sort-chunk-pages", default = "default_sort_chunk_pages")]
    pub sort_chunk_pages: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sort_chunk_pages: default_sort_chunk_pages(),
        }
    }
}

/// Default HTTP fetch transport
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Pages selected per cycle
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "max-concurrent", default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// URL admission filter
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FilterConfig {
    /// Domain patterns (e.g. "example.com" or "*.example.com") never admitted
    #[serde(rename = "deny-domains", default)]
    pub deny_domains: Vec<String>,
}

/// Multi-node operation
#[derive(Debug, Clone, Deserialize)]
pub struct DistributedConfig {
    /// Address this node's catcher listens on; must be one of `nodes`
    pub listen: String,

    /// Every node in the cluster, in router order
    pub nodes: Vec<String>,

    #[serde(rename = "sync-timeout-secs", default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,
}

fn default_max_distance() -> u32 {
    1
}

fn default_max_retries() -> Vec<u32> {
    vec![5, 3, 1]
}

fn default_hotspots() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_similarity_threshold() -> f64 {
    0.9
}

fn default_workers_per_cpu() -> f64 {
    2.0
}

fn default_queue_size() -> usize {
    256
}

fn default_sort_chunk_pages() -> usize {
    100_000
}

fn default_batch_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("ripple-frontier/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_concurrent() -> usize {
    8
}

fn default_sync_timeout_secs() -> u64 {
    600
}
