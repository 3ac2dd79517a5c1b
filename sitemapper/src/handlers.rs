use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use sitemapper_core::crawl::{CrawlOptions, execute_crawl};
use sitemapper_core::report::{CrawlReport, ReportFormat, generate_report, save_report};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Everything `crawl` needs, pulled out of the parsed arguments
pub struct CrawlArgs {
    pub options: CrawlOptions,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub print_stats: bool,
}

/// Parse a root URL argument, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Try to parse as-is
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.has_host()
    {
        return Some(with_scheme);
    }

    None
}

/// Write rendered output to `path`, or to stdout when no path is given
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => save_report(content, path)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
            stdout.flush().context("Failed to flush stdout")
        }
    }
}

pub fn crawl_args_from_matches(sub_matches: &ArgMatches, quiet: bool) -> Result<CrawlArgs> {
    let raw_url = sub_matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url must be provided"))?;
    let url = parse_url_line(raw_url).ok_or_else(|| anyhow!("Invalid URL '{}'", raw_url))?;

    let mut options = CrawlOptions::new(url, *sub_matches.get_one::<usize>("depth").unwrap_or(&2));
    if let Some(threads) = sub_matches.get_one::<usize>("threads") {
        options.threads = *threads;
    }
    if let Some(capacity) = sub_matches.get_one::<usize>("queue-capacity") {
        options.queue_capacity = *capacity;
    }
    if let Some(timeout) = sub_matches.get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    options.show_progress_bars = !quiet;

    let format_name = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("xml");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown format '{}'", format_name))?;

    Ok(CrawlArgs {
        options,
        format,
        output: sub_matches.get_one::<PathBuf>("output").cloned(),
        print_stats: sub_matches.get_flag("stats"),
    })
}

/// Run the crawl described by `args` and emit its report
pub async fn run_crawl(args: CrawlArgs) -> Result<CrawlReport> {
    let report = execute_crawl(args.options, None)
        .await
        .map_err(anyhow::Error::msg)?;

    let content = generate_report(&report, args.format).map_err(anyhow::Error::msg)?;
    write_output(&content, args.output.as_deref())?;

    if args.print_stats {
        let stats = report
            .statistics
            .to_json()
            .context("Failed to encode statistics")?;
        eprintln!("{}", stats);
    }

    Ok(report)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    init_tracing();

    let args = match crawl_args_from_matches(sub_matches, quiet) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        eprintln!("{} Crawling {}", "→".blue(), args.options.url.bright_white());
        eprintln!("  Max depth: {}", args.options.max_depth);
        eprintln!("  Workers: {}", args.options.threads);
        eprintln!();
    }

    let output = args.output.clone();
    match run_crawl(args).await {
        Ok(report) => {
            if !quiet {
                eprintln!(
                    "\n{} {} URLs mapped ({} fetch errors)",
                    "✓".green().bold(),
                    report.statistics.found_count.to_string().cyan(),
                    report.statistics.fetch_errors
                );
                if let Some(path) = output {
                    eprintln!(
                        "{} Sitemap saved to {}",
                        "✓".green().bold(),
                        path.display().to_string().bright_white()
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("{} Crawl failed: {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}
