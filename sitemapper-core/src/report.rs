// Report generation from a finished (or partial) crawl

use serde::{Deserialize, Serialize};
use sitemapper_scanner::{CrawlStatistics, ScanError, SitemapEntry, render_sitemap};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Xml,
    Json,
    Text,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "xml" | "sitemap" => Some(ReportFormat::Xml),
            "json" => Some(ReportFormat::Json),
            "text" | "txt" => Some(ReportFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub statistics: CrawlStatistics,
    pub urls: Vec<SitemapEntry>,
}

pub fn generate_report(report: &CrawlReport, format: ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Xml => generate_xml_report(report).map_err(|e| e.to_string()),
        ReportFormat::Json => generate_json_report(report).map_err(|e| e.to_string()),
        ReportFormat::Text => Ok(generate_text_report(report)),
    }
}

pub fn generate_xml_report(report: &CrawlReport) -> Result<String, ScanError> {
    render_sitemap(&report.urls)
}

pub fn generate_json_report(report: &CrawlReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

pub fn generate_text_report(report: &CrawlReport) -> String {
    let stats = &report.statistics;
    let mut text = String::new();

    text.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    text.push_str(&format!("# Sitemap for {}\n", stats.root_url));
    text.push_str(&format!("  Max depth: {}\n", stats.max_level));
    text.push_str(&format!("  URLs found: {}\n", stats.found_count));
    text.push_str(&format!("  Fetch errors: {}\n", stats.fetch_errors));
    if !stats.finished {
        text.push_str("  (partial: crawl still running)\n");
    }
    text.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    let mut urls: Vec<&SitemapEntry> = report.urls.iter().collect();
    urls.sort_by(|a, b| a.loc.cmp(&b.loc));

    for entry in urls {
        match entry.lastmod_string() {
            Some(lastmod) => text.push_str(&format!("  {}  {}\n", lastmod, entry.loc)),
            None => text.push_str(&format!("  {:10}  {}\n", "-", entry.loc)),
        }
    }

    text
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
