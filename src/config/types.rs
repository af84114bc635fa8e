use crate::crawler::PostId;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Magpie
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub target: TargetConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Seconds between the starts of two crawl cycles
    #[serde(rename = "poll-period-secs")]
    pub poll_period_secs: u64,

    /// Maximum number of top posts considered per cycle
    #[serde(rename = "posts-per-cycle")]
    pub posts_per_cycle: usize,

    /// Maximum number of simultaneous outbound fetches
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            poll_period_secs: 120,
            posts_per_cycle: 30,
            max_concurrent_fetches: 3,
        }
    }
}

impl CrawlerConfig {
    /// The poll period as a [`Duration`]
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }
}

/// Which discovery source produces the per-cycle set of post ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStrategy {
    /// Parse the ranked listing page at the base URL
    Listing,

    /// Query a JSON index endpoint returning an ordered array of numeric ids
    Index,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the aggregation site
    #[serde(rename = "base-url")]
    pub base_url: Url,

    /// Discovery strategy for the per-cycle work set
    pub discovery: DiscoveryStrategy,

    /// Index endpoint URL, required when `discovery = "index"`
    #[serde(rename = "index-url")]
    pub index_url: Option<Url>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://news.ycombinator.com")
                .expect("default base URL is valid"),
            discovery: DiscoveryStrategy::Listing,
            index_url: None,
        }
    }
}

impl TargetConfig {
    /// URL of the detail page (comment thread + article link) for a post
    pub fn detail_url(&self, id: &PostId) -> String {
        format!(
            "{}/item?id={}",
            self.base_url.as_str().trim_end_matches('/'),
            id
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for per-post download directories
    #[serde(rename = "download-dir")]
    pub download_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
        }
    }
}
