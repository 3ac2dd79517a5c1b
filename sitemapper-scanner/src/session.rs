//! Crawl session: the depth-bounded concurrent traversal behind a sitemap.
//!
//! A session owns its node table, its bounded scan queue and the in-flight
//! counter. The node table, the counter and the phase are only ever touched
//! under one lock, so admitting a link and completing a scan task are each a
//! single critical section. The counter therefore cannot read zero while a
//! task that may still admit links is running.
//!
//! The traversal moves through three phases and never goes back:
//!
//! 1. `Scanning`: every queued URL is fetched and its same-site links are
//!    admitted one level deeper, until the in-flight counter drains to zero.
//! 2. `Backfilling`: nodes on the deepest level that still lack a
//!    last-modified date get a metadata-only fetch.
//! 3. `Finished`: the session is read-only from here on.

use crate::config::CrawlConfig;
use crate::error::{AdmitError, Result, ScanError, SessionError};
use crate::fetcher::Fetcher;
use crate::sitemap::{SitemapEntry, render_sitemap};
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::{Position, Url};

/// One discovered URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlNode {
    pub location: String,
    pub url: Url,
    /// Hops from the root. Fixed at discovery.
    pub depth: usize,
    pub last_modified: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlPhase {
    Scanning,
    Backfilling,
    Finished,
}

/// Point-in-time view of a session, safe to take at any moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatistics {
    #[serde(rename = "rootURL")]
    pub root_url: String,
    pub max_level: usize,
    pub found_count: usize,
    pub pending_scan: usize,
    pub pending_backfill: usize,
    pub finished: bool,
    pub phase: CrawlPhase,
    pub fetch_errors: usize,
    pub rejected_links: usize,
}

impl CrawlStatistics {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug)]
struct SessionState {
    nodes: HashMap<String, CrawlNode>,
    pending_scan: usize,
    pending_backfill: usize,
    fetch_errors: usize,
    rejected_links: usize,
}

pub struct CrawlSession {
    root: Url,
    root_location: String,
    max_level: usize,
    fetcher: Fetcher,
    workers: Arc<Semaphore>,
    state: Mutex<SessionState>,
    queue_tx: mpsc::Sender<Url>,
    queue_rx: Mutex<Option<mpsc::Receiver<Url>>>,
    drained: Notify,
    phase: watch::Sender<CrawlPhase>,
}

impl CrawlSession {
    /// Validate and normalize `root`, then enqueue it at depth 0.
    ///
    /// Nothing is fetched until [`CrawlSession::start`] is called.
    pub fn new(
        root: &str,
        max_level: usize,
        config: CrawlConfig,
    ) -> std::result::Result<Arc<Self>, SessionError> {
        config.validate().map_err(config_error)?;

        let mut root_url = parse_root(root)?;
        root_url.set_path("");
        root_url.set_query(None);
        root_url.set_fragment(None);
        let root_location = canonical_location(&root_url);

        let fetcher = Fetcher::from_config(&config).map_err(config_error)?;

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        queue_tx
            .try_send(root_url.clone())
            .map_err(|e| SessionError::Config(format!("scan queue rejected root: {}", e)))?;

        let mut nodes = HashMap::new();
        nodes.insert(
            root_location.clone(),
            CrawlNode {
                location: root_location.clone(),
                url: root_url.clone(),
                depth: 0,
                last_modified: None,
            },
        );

        let (phase, _) = watch::channel(CrawlPhase::Scanning);

        debug!("Created session for {} (max level {})", root_location, max_level);

        Ok(Arc::new(Self {
            root: root_url,
            root_location,
            max_level,
            fetcher,
            workers: Arc::new(Semaphore::new(config.workers)),
            state: Mutex::new(SessionState {
                nodes,
                pending_scan: 1,
                pending_backfill: 0,
                fetch_errors: 0,
                rejected_links: 0,
            }),
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
            drained: Notify::new(),
            phase,
        }))
    }

    pub fn root_location(&self) -> &str {
        &self.root_location
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn phase(&self) -> CrawlPhase {
        *self.phase.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == CrawlPhase::Finished
    }

    /// Launch the traversal in the background. Call exactly once.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).scan())
    }

    /// Start the traversal and wait until both phases are done.
    pub async fn crawl(self: &Arc<Self>) -> Result<()> {
        self.start().await?;
        Ok(())
    }

    /// Resolves once the session reaches `Finished`.
    pub async fn wait_finished(&self) {
        let mut phase = self.phase.subscribe();
        if phase
            .wait_for(|phase| *phase == CrawlPhase::Finished)
            .await
            .is_err()
        {
            warn!("Phase channel closed before {} finished", self.root_location);
        }
    }

    /// Coordinator loop: take a worker permit, then hand the next queued URL
    /// and the permit to a scan task. Stops when the in-flight counter drains,
    /// then runs the backfill phase.
    ///
    /// Nothing is taken off the queue while every worker is busy, so a full
    /// queue holds producers back in [`CrawlSession::add`].
    pub async fn scan(self: Arc<Self>) {
        let Some(mut queue) = self.queue_rx.lock().await.take() else {
            warn!("Scan of {} was already started", self.root_location);
            return;
        };

        info!(
            "Starting crawl of {} (max level {})",
            self.root_location, self.max_level
        );

        loop {
            let Ok(permit) = Arc::clone(&self.workers).acquire_owned().await else {
                warn!("Worker pool closed during scan of {}", self.root_location);
                break;
            };
            tokio::select! {
                biased;
                Some(url) = queue.recv() => {
                    let session = Arc::clone(&self);
                    tokio::spawn(async move { session.scan_url(url, permit).await });
                }
                _ = self.drained.notified() => break,
            }
        }

        info!("Scan of {} drained, backfilling last-modified dates", self.root_location);
        self.backfill().await;
    }

    /// Admit a discovered link at `depth`.
    ///
    /// This is the only way a URL enters the traversal. The first admission
    /// of a location fixes its depth.
    pub async fn add(&self, link: &str, depth: usize) -> std::result::Result<(), AdmitError> {
        let url = resolve_link(&self.root, link)?;
        let location = canonical_location(&url);

        if depth > self.max_level {
            return Err(AdmitError::TooDeep(location));
        }

        {
            let mut state = self.state.lock().await;
            if self.phase() != CrawlPhase::Scanning {
                return Err(AdmitError::Closed(location));
            }
            if state.nodes.contains_key(&location) {
                return Err(AdmitError::AlreadyAdded(location));
            }
            state.nodes.insert(
                location.clone(),
                CrawlNode {
                    location: location.clone(),
                    url: url.clone(),
                    depth,
                    last_modified: None,
                },
            );
            state.pending_scan += 1;
        }

        debug!("Admitted {} at depth {}", location, depth);

        // Blocks while the queue is full. The caller still holds its own
        // pending count here, so the session cannot drain meanwhile.
        if self.queue_tx.send(url).await.is_err() {
            warn!("Scan queue closed, dropping {}", location);
            self.state.lock().await.nodes.remove(&location);
            self.complete_scan(0, false).await;
            return Err(AdmitError::Closed(location));
        }
        Ok(())
    }

    /// Fetch one page and admit its links. The permit covers the fetch only:
    /// it is released before admission, which may wait on a full queue.
    async fn scan_url(self: Arc<Self>, url: Url, permit: OwnedSemaphorePermit) {
        let location = canonical_location(&url);

        let fetched = self.fetcher.fetch(&url).await;
        drop(permit);

        let mut rejected = 0;
        let failed = match fetched {
            Ok(result) => {
                let depth = self.record_page(&location, result.last_modified).await;
                let next_depth = depth.map(|d| d + 1);
                if let Some(next_depth) = next_depth.filter(|d| *d <= self.max_level) {
                    for link in &result.links {
                        if let Err(e) = self.add(link, next_depth).await {
                            debug!("Skipping link on {}: {}", location, e);
                            rejected += 1;
                        }
                    }
                }
                false
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", location, e);
                true
            }
        };

        self.complete_scan(rejected, failed).await;
    }

    /// Store the page's last-modified date if it has none yet and return the
    /// node's depth.
    async fn record_page(&self, location: &str, last_modified: Option<NaiveDate>) -> Option<usize> {
        let mut state = self.state.lock().await;
        let node = state.nodes.get_mut(location)?;
        if node.last_modified.is_none() {
            node.last_modified = last_modified;
        }
        Some(node.depth)
    }

    /// Signal that one scan task is done. Wakes the coordinator when the last
    /// outstanding task completes.
    async fn complete_scan(&self, rejected: usize, failed: bool) {
        let mut state = self.state.lock().await;
        state.rejected_links += rejected;
        if failed {
            state.fetch_errors += 1;
        }
        state.pending_scan = state.pending_scan.saturating_sub(1);
        if state.pending_scan == 0 && self.phase() == CrawlPhase::Scanning {
            self.phase.send_replace(CrawlPhase::Backfilling);
            self.drained.notify_one();
        }
    }

    async fn backfill(self: &Arc<Self>) {
        let frontier: Vec<(String, Url)> = {
            let mut state = self.state.lock().await;
            let frontier: Vec<(String, Url)> = state
                .nodes
                .values()
                .filter(|node| node.depth == self.max_level && node.last_modified.is_none())
                .map(|node| (node.location.clone(), node.url.clone()))
                .collect();
            state.pending_backfill = frontier.len();
            frontier
        };

        debug!("Backfilling {} frontier nodes", frontier.len());

        let handles: Vec<JoinHandle<()>> = frontier
            .into_iter()
            .map(|(location, url)| {
                let session = Arc::clone(self);
                tokio::spawn(async move {
                    let last_modified = {
                        let _permit = session.workers.acquire().await.ok();
                        session.fetcher.fetch_last_modified(&url).await
                    };
                    let mut state = session.state.lock().await;
                    if let Some(node) = state.nodes.get_mut(&location)
                        && node.last_modified.is_none()
                    {
                        node.last_modified = last_modified;
                    }
                    state.pending_backfill = state.pending_backfill.saturating_sub(1);
                })
            })
            .collect();

        for outcome in join_all(handles).await {
            if let Err(e) = outcome {
                warn!("Backfill task failed: {}", e);
            }
        }

        let found = {
            let mut state = self.state.lock().await;
            state.pending_backfill = 0;
            self.phase.send_replace(CrawlPhase::Finished);
            state.nodes.len()
        };

        info!("Crawl of {} complete. Found {} URLs", self.root_location, found);
    }

    pub async fn statistics(&self) -> CrawlStatistics {
        let state = self.state.lock().await;
        let phase = self.phase();
        CrawlStatistics {
            root_url: self.root_location.clone(),
            max_level: self.max_level,
            found_count: state.nodes.len(),
            pending_scan: state.pending_scan,
            pending_backfill: state.pending_backfill,
            finished: phase == CrawlPhase::Finished,
            phase,
            fetch_errors: state.fetch_errors,
            rejected_links: state.rejected_links,
        }
    }

    /// Snapshot of every discovered node, sorted by location.
    pub async fn nodes(&self) -> Vec<CrawlNode> {
        let state = self.state.lock().await;
        let mut nodes: Vec<CrawlNode> = state.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.location.cmp(&b.location));
        nodes
    }

    /// Sitemap entries for every discovered node, sorted by location. Before
    /// the session finishes this is a partial but consistent snapshot.
    pub async fn sitemap_entries(&self) -> Vec<SitemapEntry> {
        self.nodes()
            .await
            .into_iter()
            .map(|node| SitemapEntry {
                loc: node.location,
                lastmod: node.last_modified,
            })
            .collect()
    }

    pub async fn sitemap(&self) -> Result<String> {
        render_sitemap(&self.sitemap_entries().await)
    }
}

fn config_error(e: ScanError) -> SessionError {
    match e {
        ScanError::Config(msg) => SessionError::Config(msg),
        other => SessionError::Config(other.to_string()),
    }
}

fn parse_root(root: &str) -> std::result::Result<Url, SessionError> {
    let url = Url::parse(root).map_err(|e| match e {
        url::ParseError::EmptyHost => SessionError::MissingHost(root.to_string()),
        _ => SessionError::InvalidUrl(format!("{}: {}", root, e)),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(SessionError::InvalidUrl(root.to_string()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SessionError::MissingHost(root.to_string()));
    }
    Ok(url)
}

/// Resolve a raw link against the session root and check it stays on the
/// root's site. The returned URL carries no fragment.
pub fn resolve_link(root: &Url, link: &str) -> std::result::Result<Url, AdmitError> {
    let mut url = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => root
            .join(link)
            .map_err(|e| AdmitError::InvalidUrl(format!("{}: {}", link, e)))?,
        Err(e) => return Err(AdmitError::InvalidUrl(format!("{}: {}", link, e))),
    };

    if url.cannot_be_a_base() {
        return Err(AdmitError::InvalidUrl(link.to_string()));
    }

    url.set_fragment(None);

    if url.scheme() != root.scheme()
        || url.host_str() != root.host_str()
        || url.port_or_known_default() != root.port_or_known_default()
    {
        return Err(AdmitError::NotSameSite(url.to_string()));
    }

    Ok(url)
}

/// Node table key: scheme, authority, path and query, with a bare `/` path
/// treated as empty so `http://a/` and `http://a` are the same node.
pub fn canonical_location(url: &Url) -> String {
    if url.path() != "/" {
        return url[..Position::AfterQuery].to_string();
    }
    let mut location = url[..Position::BeforePath].to_string();
    if let Some(query) = url.query() {
        location.push('?');
        location.push_str(query);
    }
    location
}
