use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of fetching one page.
///
/// `links` holds raw `href` values in document order. They are neither resolved
/// nor deduplicated here; the crawl session filters them on admission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub last_modified: Option<NaiveDate>,
    pub links: Vec<String>,
}

impl FetchResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }
}
