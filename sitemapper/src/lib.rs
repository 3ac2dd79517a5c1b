pub mod commands;

// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{parse_url_line, write_output};

// Re-export crawl functionality from sitemapper-core
pub use sitemapper_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};
pub use sitemapper_core::report::{CrawlReport, ReportFormat, generate_report};
