pub mod config;
pub mod error;
pub mod fetcher;
pub mod result;
pub mod session;
pub mod sitemap;

pub use config::CrawlConfig;
pub use error::{AdmitError, ScanError, SessionError};
pub use fetcher::Fetcher;
pub use result::FetchResult;
pub use session::{CrawlNode, CrawlPhase, CrawlSession, CrawlStatistics};
pub use sitemap::{SitemapEntry, render_sitemap};
