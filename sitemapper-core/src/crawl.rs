use crate::report::CrawlReport;
use indicatif::{ProgressBar, ProgressStyle};
use sitemapper_scanner::{CrawlConfig, CrawlPhase, CrawlSession, CrawlStatistics};
use std::sync::Arc;
use std::time::Duration;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    pub max_depth: usize,
    pub threads: usize,
    pub queue_capacity: usize,
    pub timeout_secs: u64,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>, max_depth: usize) -> Self {
        let defaults = CrawlConfig::default();
        Self {
            url: url.into(),
            max_depth,
            threads: defaults.workers,
            queue_capacity: defaults.queue_capacity,
            timeout_secs: defaults.timeout_secs,
            show_progress_bars: false,
        }
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::new()
            .with_workers(self.threads)
            .with_queue_capacity(self.queue_capacity)
            .with_timeout(self.timeout_secs)
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// One-line progress summary for a running session
pub fn format_progress(stats: &CrawlStatistics) -> String {
    match stats.phase {
        CrawlPhase::Scanning => format!(
            "Crawling... {} URLs found, {} in flight",
            stats.found_count, stats.pending_scan
        ),
        CrawlPhase::Backfilling => format!(
            "Backfilling last-modified dates... {} URLs found, {} pending",
            stats.found_count, stats.pending_backfill
        ),
        CrawlPhase::Finished => format!("Crawl complete! {} URLs found", stats.found_count),
    }
}

/// Execute a crawl with the given options
/// Returns the final statistics and every discovered URL
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlReport, String> {
    let config = options.crawl_config();
    let session = CrawlSession::new(&options.url, options.max_depth, config)
        .map_err(|e| format!("Failed to start crawl of {}: {}", options.url, e))?;

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| e.to_string())?;
        pb.set_style(style);
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let mut handle = session.start();
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);

    loop {
        tokio::select! {
            joined = &mut handle => {
                joined.map_err(|e| format!("Crawl task failed: {}", e))?;
                break;
            }
            _ = ticker.tick() => {
                let message = format_progress(&session.statistics().await);
                if let Some(ref pb) = progress_bar {
                    pb.set_message(message.clone());
                    pb.tick();
                }
                if let Some(ref callback) = progress_callback {
                    callback(message);
                }
            }
        }
    }

    let statistics = session.statistics().await;

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format_progress(&statistics));
    }

    Ok(CrawlReport {
        statistics,
        urls: session.sitemap_entries().await,
    })
}
