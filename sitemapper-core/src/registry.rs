//! Process-wide table of running crawl sessions, keyed by opaque token.
//!
//! Sessions are inserted on creation and only leave through
//! [`SessionRegistry::remove`]. There is no expiry, so a long-lived process
//! that never removes sessions grows without bound.

use sitemapper_scanner::error::Result as ScanResult;
use sitemapper_scanner::{CrawlConfig, CrawlSession, CrawlStatistics, SessionError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub struct SessionRegistry {
    config: CrawlConfig,
    sessions: Mutex<HashMap<String, Arc<CrawlSession>>>,
}

impl SessionRegistry {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session, register it under a fresh token, then start its
    /// crawl in the background.
    pub async fn create(
        &self,
        root: &str,
        max_level: usize,
    ) -> Result<(String, Arc<CrawlSession>), SessionError> {
        let session = CrawlSession::new(root, max_level, self.config.clone())?;
        let token = Uuid::new_v4().simple().to_string();

        self.sessions
            .lock()
            .await
            .insert(token.clone(), Arc::clone(&session));

        info!("Registered crawl of {} as {}", session.root_location(), token);
        session.start();

        Ok((token, session))
    }

    pub async fn get(&self, token: &str) -> Option<Arc<CrawlSession>> {
        self.sessions.lock().await.get(token).cloned()
    }

    pub async fn statistics(&self, token: &str) -> Option<CrawlStatistics> {
        let session = self.get(token).await?;
        Some(session.statistics().await)
    }

    pub async fn sitemap(&self, token: &str) -> Option<ScanResult<String>> {
        let session = self.get(token).await?;
        Some(session.sitemap().await)
    }

    pub async fn remove(&self, token: &str) -> Option<Arc<CrawlSession>> {
        self.sessions.lock().await.remove(token)
    }

    pub async fn tokens(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(CrawlConfig::default())
    }
}
