//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use webdoc_core::pipeline::{ConvertOutcome, ConvertRequest, ConvertSummary, ProgressReporter};
use webdoc_core::select::UrlSelector;
use webdoc_crawler::PageStatus;
use webdoc_shared::{AppConfig, CrawlConfig, OutputFormat, SitemapMode, init_config, load_config, split_list};

use crate::prompt::{PromptSelector, TextSelector};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// webdoc: turn a documentation site into one offline document.
#[derive(Parser)]
#[command(
    name = "webdoc",
    version,
    about = "Crawl a documentation site and convert it into a single PDF, HTML, Markdown, JSON or DOCX file.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a site and write it as one document.
    Convert(ConvertArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `webdoc convert`. Unset options fall back to the config file.
#[derive(Args, Debug)]
pub(crate) struct ConvertArgs {
    /// URL to start crawling from.
    pub url: Url,

    /// Output file path (default: output.<format>).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: pdf, html, md (markdown), json or docx.
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Maximum link depth from the seed (default: unlimited).
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Maximum number of pages to fetch.
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Delay between requests, in seconds.
    #[arg(long)]
    pub delay: Option<f64>,

    /// Request timeout, in seconds.
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Number of pages fetched in parallel.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Retries for transient fetch failures.
    #[arg(long)]
    pub retries: Option<u32>,

    /// Only include pages containing these keywords (comma-separated).
    #[arg(long)]
    pub contains: Option<String>,

    /// Exclude pages containing these keywords (comma-separated).
    #[arg(long)]
    pub not_contains: Option<String>,

    /// Only include pages from these categories (comma-separated).
    #[arg(long)]
    pub categories: Option<String>,

    /// Discover pages from the site's sitemap.
    #[arg(long)]
    pub use_sitemap: bool,

    /// Sitemap URL (implies --use-sitemap).
    #[arg(long)]
    pub sitemap_url: Option<Url>,

    /// Add a table of contents.
    #[arg(long)]
    pub toc: bool,

    /// Pick pages from the discovered list before converting.
    #[arg(short, long)]
    pub interactive: bool,

    /// Document title (default: derived from the URL).
    #[arg(long)]
    pub title: Option<String>,

    /// Reference images by URL instead of embedding them.
    #[arg(long)]
    pub no_images: bool,

    /// Omit the per-page source line.
    #[arg(long)]
    pub no_source_links: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "webdoc=info",
        1 => "webdoc=debug",
        _ => "webdoc=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert(args) => cmd_convert(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Merge CLI arguments over the loaded config. CLI flags win.
pub(crate) fn build_request(args: &ConvertArgs, config: &AppConfig) -> Result<ConvertRequest> {
    let mut crawl = CrawlConfig::from_app_config(args.url.clone(), config)?;

    if let Some(depth) = args.max_depth {
        crawl.max_depth = Some(depth);
    }
    if let Some(pages) = args.max_pages {
        crawl.max_pages = pages;
    }
    if let Some(delay) = args.delay {
        crawl.delay = webdoc_shared::seconds("delay", delay)?;
    }
    if let Some(timeout) = args.timeout {
        crawl.timeout = webdoc_shared::seconds("timeout", timeout)?;
    }
    if let Some(concurrency) = args.concurrency {
        crawl.concurrency = concurrency;
    }
    if let Some(retries) = args.retries {
        crawl.retries = retries;
    }
    if let Some(raw) = &args.contains {
        crawl.filters.contains = split_list(raw);
    }
    if let Some(raw) = &args.not_contains {
        crawl.filters.not_contains = split_list(raw);
    }
    if let Some(raw) = &args.categories {
        crawl.filters.categories = split_list(raw);
    }
    crawl.sitemap = match (&args.sitemap_url, args.use_sitemap) {
        (Some(url), _) => SitemapMode::Url(url.clone()),
        (None, true) => SitemapMode::Auto,
        (None, false) => SitemapMode::Off,
    };
    crawl.validate()?;

    let format = args.format.unwrap_or(config.defaults.format);
    let mut request = ConvertRequest::new(crawl, format);
    request.output = args.output.clone();
    request.toc = args.toc || config.defaults.toc;
    request.interactive = args.interactive;
    request.title = args.title.clone();
    request.render.embed_images = !args.no_images;
    request.render.source_links = !args.no_source_links;
    Ok(request)
}

async fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let config = load_config()?;
    let request = build_request(&args, &config)?;

    info!(
        url = %request.crawl.seed,
        format = %request.format,
        max_pages = request.crawl.max_pages,
        "converting documentation site"
    );

    let reporter = Arc::new(CliProgress::new());
    let selector: Option<Box<dyn UrlSelector>> = if request.interactive {
        Some(if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
            Box::new(PromptSelector::new(reporter.spinner.clone()))
        } else {
            Box::new(TextSelector)
        })
    } else {
        None
    };

    let outcome = webdoc_core::pipeline::convert(&request, reporter.clone(), selector.as_deref()).await;
    reporter.spinner.finish_and_clear();

    match outcome? {
        ConvertOutcome::Written(summary) => print_summary(&summary),
        ConvertOutcome::Cancelled => println!("Cancelled; nothing was written."),
    }
    Ok(())
}

fn print_summary(summary: &ConvertSummary) {
    let report = &summary.report;
    println!();
    println!("  Document written successfully!");
    println!("  Output:   {}", summary.output_path.display());
    println!("  Format:   {}", summary.format);
    println!("  Pages:    {}", summary.pages);
    if summary.toc_entries > 0 {
        println!("  TOC:      {} entries", summary.toc_entries);
    }
    println!(
        "  Crawl:    {} fetched, {} filtered, {} skipped",
        report.pages_fetched, report.pages_filtered, report.pages_skipped
    );
    if let Some(sitemap) = &report.sitemap_url {
        println!("  Sitemap:  {sitemap}");
    }
    println!("  Failures: {}", report.failures.len());
    for (url, reason) in report.failures.iter().take(10) {
        println!("    {url}: {reason}");
    }
    if report.failures.len() > 10 {
        println!("    ... and {} more", report.failures.len() - 10);
    }
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    started: AtomicUsize,
    included: AtomicUsize,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self {
            spinner,
            started: AtomicUsize::new(0),
            included: AtomicUsize::new(0),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_started(&self, url: &Url, depth: u32) {
        let n = self.started.fetch_add(1, Ordering::Relaxed) + 1;
        let kept = self.included.load(Ordering::Relaxed);
        self.spinner
            .set_message(format!("Fetching [{n}, {kept} kept] (depth {depth}) {url}"));
    }

    fn page_finished(&self, _url: &Url, status: PageStatus) {
        if status == PageStatus::Included {
            self.included.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn done(&self, _summary: &ConvertSummary) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
