//! End-to-end `convert` pipeline: seed URL → crawl → TOC → render → file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use url::Url;

use webdoc_crawler::{CrawlProgress, CrawlReport, Crawler, PageStatus};
use webdoc_render::RenderOptions;
use webdoc_shared::{CrawlConfig, Document, OutputFormat, Result, WebdocError};

use crate::output::{resolve_output_path, write_output};
use crate::select::{Selection, UrlSelector};
use crate::toc;

/// Everything one conversion needs.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    /// Crawl settings, including the seed URL.
    pub crawl: CrawlConfig,
    /// Artifact format.
    pub format: OutputFormat,
    /// Output path; `output.<ext>` when absent.
    pub output: Option<PathBuf>,
    /// Derive and render a table of contents.
    pub toc: bool,
    /// Let a [`UrlSelector`] pick pages before extraction.
    pub interactive: bool,
    /// Replaces the default document title.
    pub title: Option<String>,
    pub render: RenderOptions,
}

impl ConvertRequest {
    pub fn new(crawl: CrawlConfig, format: OutputFormat) -> Self {
        Self {
            crawl,
            format,
            output: None,
            toc: false,
            interactive: false,
            title: None,
            render: RenderOptions::default(),
        }
    }
}

/// Result of a conversion that wrote an artifact.
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    /// Where the artifact was written.
    pub output_path: PathBuf,
    pub format: OutputFormat,
    /// Crawl statistics and failures.
    pub report: CrawlReport,
    /// Pages in the rendered document.
    pub pages: usize,
    pub toc_entries: usize,
    /// Artifact size.
    pub bytes: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// How a conversion ended.
#[derive(Debug, Clone)]
pub enum ConvertOutcome {
    Written(ConvertSummary),
    /// The user quit during interactive selection; nothing was written.
    Cancelled,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a page fetch starts.
    fn page_started(&self, _url: &Url, _depth: u32) {}
    /// Called when a page reaches its final state.
    fn page_finished(&self, _url: &Url, _status: PageStatus) {}
    /// Called once the artifact is written.
    fn done(&self, summary: &ConvertSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &ConvertSummary) {}
}

/// Run the full `convert` pipeline.
///
/// 1. Crawl (or discover, select, then crawl the selection)
/// 2. Build the TOC when requested
/// 3. Render the document
/// 4. Write the artifact atomically
///
/// A run that yields no pages fails before anything is written.
#[instrument(skip_all, fields(seed = %request.crawl.seed, format = %request.format))]
pub async fn convert(
    request: &ConvertRequest,
    progress: Arc<dyn ProgressReporter>,
    selector: Option<&dyn UrlSelector>,
) -> Result<ConvertOutcome> {
    let start = Instant::now();
    info!(seed = %request.crawl.seed, format = %request.format, "starting conversion");

    let crawler = Crawler::new(request.crawl.clone())?
        .with_progress(Arc::new(PipelineCrawlProgress {
            inner: Arc::clone(&progress),
        }));

    // --- Phase 1: Crawl ---
    let (report, mut doc) = if request.interactive {
        let selector =
            selector.ok_or_else(|| WebdocError::config("interactive mode needs a page selector"))?;
        match select_and_crawl(&crawler, selector, progress.as_ref()).await? {
            Some(result) => result,
            None => {
                info!("selection cancelled");
                return Ok(ConvertOutcome::Cancelled);
            }
        }
    } else {
        progress.phase("Crawling pages");
        crawler.run().await?
    };

    if doc.is_empty() {
        return Err(WebdocError::validation(format!(
            "no pages were extracted from {} ({} fetched, {} filtered, {} failed)",
            request.crawl.seed,
            report.pages_fetched,
            report.pages_filtered,
            report.failures.len()
        )));
    }
    if let Some(title) = request.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        doc.title = title.to_string();
    }

    // --- Phase 2: TOC ---
    let toc = if request.toc {
        progress.phase("Building table of contents");
        Some(toc::build_toc(&doc))
    } else {
        None
    };

    // --- Phase 3: Render ---
    progress.phase(&format!("Rendering {}", request.format));
    let bytes = webdoc_render::render(request.format, &doc, toc.as_deref(), &request.render)?;

    // --- Phase 4: Write ---
    let output_path = resolve_output_path(request.output.as_deref(), request.format);
    progress.phase("Writing output");
    write_output(&output_path, &bytes)?;

    let summary = summarize(request, report, &doc, toc.as_ref().map_or(0, Vec::len), bytes.len(), output_path, start);
    progress.done(&summary);

    info!(
        pages = summary.pages,
        failures = summary.report.failures.len(),
        bytes = summary.bytes,
        output = %summary.output_path.display(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "conversion complete"
    );

    Ok(ConvertOutcome::Written(summary))
}

/// Discover candidates, ask the selector, and crawl what it picked.
/// `None` means the user quit.
async fn select_and_crawl(
    crawler: &Crawler,
    selector: &dyn UrlSelector,
    progress: &dyn ProgressReporter,
) -> Result<Option<(CrawlReport, Document)>> {
    progress.phase("Discovering pages");
    let (discovery, tasks) = crawler.discover().await?;
    if tasks.is_empty() {
        return Err(WebdocError::validation(format!(
            "no pages discovered from {} ({} failed)",
            crawler.config().seed,
            discovery.failures.len()
        )));
    }
    info!(candidates = tasks.len(), "pages discovered");

    let urls: Vec<Url> = tasks.iter().map(|t| t.url.clone()).collect();
    let selection = selector.select(&urls)?;
    let Some(selected) = selection.apply(tasks) else {
        return Ok(None);
    };
    if selected.is_empty() {
        return Err(WebdocError::validation("no pages selected"));
    }

    progress.phase("Crawling selected pages");
    let (mut report, doc) = crawler.crawl_selected(selected).await?;
    report.sitemap_url = discovery.sitemap_url;
    Ok(Some((report, doc)))
}

fn summarize(
    request: &ConvertRequest,
    report: CrawlReport,
    doc: &Document,
    toc_entries: usize,
    bytes: usize,
    output_path: PathBuf,
    start: Instant,
) -> ConvertSummary {
    ConvertSummary {
        output_path,
        format: request.format,
        report,
        pages: doc.len(),
        toc_entries,
        bytes,
        elapsed: start.elapsed(),
    }
}

// ---------------------------------------------------------------------------
// Crawl progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the crawler's `CrawlProgress` interface.
struct PipelineCrawlProgress {
    inner: Arc<dyn ProgressReporter>,
}

impl CrawlProgress for PipelineCrawlProgress {
    fn page_started(&self, url: &Url, depth: u32) {
        self.inner.page_started(url, depth);
    }

    fn page_finished(&self, url: &Url, status: PageStatus) {
        self.inner.page_finished(url, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::temp_dir;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(title: &str, body: &str) -> String {
        format!("<html><head><title>{title}</title></head><body><main>{body}</main></body></html>")
    }

    async fn site() -> MockServer {
        let server = MockServer::start().await;
        let pages = [
            (
                "/docs/",
                page(
                    "Docs",
                    r#"<h1>Docs</h1><p>Start here.</p><a href="/docs/install">Install</a><a href="/docs/usage">Usage</a>"#,
                ),
            ),
            ("/docs/install", page("Install", "<h1>Install</h1><h2>Linux</h2><p>Use the package.</p>")),
            ("/docs/usage", page("Usage", "<h1>Usage</h1><p>Run the tool.</p>")),
        ];
        for (at, html) in pages {
            Mock::given(method("GET"))
                .and(path(at))
                .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
                .mount(&server)
                .await;
        }
        server
    }

    fn request(server: &MockServer, format: OutputFormat, out: PathBuf) -> ConvertRequest {
        let mut crawl = CrawlConfig::new(Url::parse(&format!("{}/docs/", server.uri())).unwrap());
        crawl.delay = Duration::ZERO;
        crawl.retries = 0;
        let mut request = ConvertRequest::new(crawl, format);
        request.output = Some(out);
        request
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        finished: Mutex<usize>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn page_finished(&self, _url: &Url, _status: PageStatus) {
            *self.finished.lock().unwrap() += 1;
        }
        fn done(&self, _summary: &ConvertSummary) {}
    }

    struct FixedSelector(Selection);

    impl UrlSelector for FixedSelector {
        fn select(&self, _candidates: &[Url]) -> Result<Selection> {
            Ok(self.0.clone())
        }
    }

    fn written(outcome: ConvertOutcome) -> ConvertSummary {
        match outcome {
            ConvertOutcome::Written(summary) => summary,
            ConvertOutcome::Cancelled => panic!("unexpected cancel"),
        }
    }

    #[tokio::test]
    async fn converts_site_to_markdown_file() {
        let server = site().await;
        let tmp = temp_dir("pipeline");
        let mut req = request(&server, OutputFormat::Markdown, tmp.join("guide"));
        req.toc = true;
        req.title = Some("My Guide".into());

        let progress = Arc::new(RecordingProgress::default());
        let summary = written(convert(&req, progress.clone(), None).await.unwrap());

        assert_eq!(summary.output_path, tmp.join("guide.md"));
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.toc_entries, 4);
        assert!(summary.report.failures.is_empty());

        let md = std::fs::read_to_string(&summary.output_path).unwrap();
        assert!(md.starts_with("# My Guide\n"));
        assert!(md.contains("## Table of contents"));
        assert!(md.contains("  - [Linux](#p2-linux)"));

        assert_eq!(*progress.finished.lock().unwrap(), 3);
        let phases = progress.phases.lock().unwrap();
        assert_eq!(phases.first().map(String::as_str), Some("Crawling pages"));
        assert!(phases.iter().any(|p| p == "Building table of contents"));

        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[tokio::test]
    async fn zero_pages_fails_without_writing() {
        let server = site().await;
        let tmp = temp_dir("pipeline");
        let target = tmp.join("out.html");
        let mut req = request(&server, OutputFormat::Html, target.clone());
        req.crawl.filters.not_contains = vec!["docs".into()];

        let err = convert(&req, Arc::new(SilentProgress), None).await.unwrap_err();
        assert!(matches!(err, WebdocError::Validation { .. }));
        assert!(!target.exists());

        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[tokio::test]
    async fn interactive_selection_limits_pages() {
        let server = site().await;
        let tmp = temp_dir("pipeline");
        let mut req = request(&server, OutputFormat::Json, tmp.join("picked.json"));
        req.interactive = true;

        let selector = FixedSelector(Selection::Pages(vec![2]));
        let summary = written(convert(&req, Arc::new(SilentProgress), Some(&selector)).await.unwrap());
        assert_eq!(summary.pages, 1);

        let json = std::fs::read(&summary.output_path).unwrap();
        let pages = webdoc_render::parse_json(&json).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].url.ends_with("/docs/usage"));

        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[tokio::test]
    async fn interactive_quit_writes_nothing() {
        let server = site().await;
        let tmp = temp_dir("pipeline");
        let target = tmp.join("quit.html");
        let mut req = request(&server, OutputFormat::Html, target.clone());
        req.interactive = true;

        let selector = FixedSelector(Selection::Quit);
        let outcome = convert(&req, Arc::new(SilentProgress), Some(&selector)).await.unwrap();
        assert!(matches!(outcome, ConvertOutcome::Cancelled));
        assert!(!target.exists());

        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[tokio::test]
    async fn interactive_without_selector_is_config_error() {
        let server = site().await;
        let mut req = request(&server, OutputFormat::Html, PathBuf::from("unused.html"));
        req.interactive = true;
        let err = convert(&req, Arc::new(SilentProgress), None).await.unwrap_err();
        assert!(matches!(err, WebdocError::Config { .. }));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_crawling() {
        let server = site().await;
        let mut req = request(&server, OutputFormat::Html, PathBuf::from("unused.html"));
        req.crawl.max_pages = 0;
        let err = convert(&req, Arc::new(SilentProgress), None).await.unwrap_err();
        assert!(matches!(err, WebdocError::Config { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
