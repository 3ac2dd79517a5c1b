use colored::Colorize;

pub mod crawl;
pub mod registry;
pub mod report;

pub use registry::SessionRegistry;

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "sitemapper".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    eprintln!("{}", "crawl a site, write its sitemap".bright_black());
    eprintln!();
}
