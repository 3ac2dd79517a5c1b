use crate::error::{Result, ScanError};
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_USER_AGENT: &str = "Sitemapper/0.1 (+https://github.com/sitemapper/sitemapper)";

/// Tuning knobs for a crawl session.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub timeout_secs: u64,
    /// Upper bound on concurrent outbound requests.
    pub workers: usize,
    /// Capacity of the scan queue. Producers wait when it is full.
    pub queue_capacity: usize,
    pub user_agent: String,
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ScanError::Config("workers must be greater than 0".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(ScanError::Config(
                "queue capacity must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ScanError::Config("timeout must be at least 1 second".to_string()));
        }
        Ok(())
    }

    /// Build the HTTP client shared by every fetch of a session.
    pub fn build_client(&self) -> Result<Client> {
        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(self.workers)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(client)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::new()
    }
}
