//! Breadth-first, scope-aware crawl scheduler.
//!
//! The scheduler owns the frontier queue and the [`VisitedSet`]. Pages are
//! fetched by a bounded pool of workers in a [`JoinSet`]; everything a worker
//! produces (links, page, assets) is merged back on the scheduler task, so
//! the document builder and the queue are never shared.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;
use webdoc_discovery::{SitemapOptions, SitemapResult};
use webdoc_shared::{
    Block, CrawlConfig, CrawlTask, Document, DocumentBuilder, ImageAsset, PageContent, Result,
    SitemapMode, WebdocError,
};

use crate::fetcher::{Fetcher, HtmlResponse};
use crate::images::ImageResolver;
use crate::scope::{CrawlScope, PageFilter, RejectReason, ScopeDecision, normalize};

// ---------------------------------------------------------------------------
// CrawlReport
// ---------------------------------------------------------------------------

/// Summary of a completed crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Pages fetched successfully.
    pub pages_fetched: usize,
    /// Pages added to the document.
    pub pages_included: usize,
    /// Pages dropped by keyword or category filters.
    pub pages_filtered: usize,
    /// Tasks skipped for depth, budget, duplicate or out-of-scope redirect targets.
    pub pages_skipped: usize,
    /// Failures as (URL, reason).
    pub failures: Vec<(String, String)>,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Extraction strategy that handled the first included page.
    pub primary_strategy: Option<&'static str>,
    /// Sitemap the frontier came from, when sitemap mode was used.
    pub sitemap_url: Option<Url>,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Final state of one crawled page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Included,
    Filtered,
    Discovered,
    Skipped,
    Failed,
}

/// Observer for per-page crawl progress. All methods default to no-ops.
pub trait CrawlProgress: Send + Sync {
    fn page_started(&self, _url: &Url, _depth: u32) {}
    fn page_finished(&self, _url: &Url, _status: PageStatus) {}
}

/// Progress observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {}

// ---------------------------------------------------------------------------
// VisitedSet
// ---------------------------------------------------------------------------

/// Normalized URLs already enqueued or fetched during one run.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically mark `url` (normalized) as visited. Returns `false` when it
    /// already was.
    pub async fn check_and_mark(&self, url: &Url) -> bool {
        self.inner.lock().await.insert(normalize(url).to_string())
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// What a worker does with a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Extract content, filter, resolve images.
    Extract,
    /// Only collect out-links (interactive discovery).
    LinksOnly,
}

/// Initial queue and whether links are followed from it.
struct Frontier {
    tasks: Vec<CrawlTask>,
    follow_links: bool,
    sitemap_url: Option<Url>,
}

/// State shared with workers.
struct CrawlContext {
    config: CrawlConfig,
    fetcher: Fetcher,
    scope: CrawlScope,
    filter: PageFilter,
    images: ImageResolver,
}

/// Breadth-first crawler over one documentation site.
pub struct Crawler {
    ctx: Arc<CrawlContext>,
    progress: Arc<dyn CrawlProgress>,
}

impl Crawler {
    /// Create a crawler after validating `config`.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = Fetcher::new(&config)?;
        let ctx = CrawlContext {
            scope: CrawlScope::new(&config.seed),
            filter: PageFilter::new(&config.filters),
            images: ImageResolver::new(fetcher.clone()),
            fetcher,
            config,
        };
        Ok(Self {
            ctx: Arc::new(ctx),
            progress: Arc::new(SilentProgress),
        })
    }

    /// Report per-page progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn CrawlProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.ctx.config
    }

    pub fn scope(&self) -> &CrawlScope {
        &self.ctx.scope
    }

    /// Crawl the site and assemble every included page into a [`Document`].
    ///
    /// Only an unreachable seed (in link-following mode) is fatal; all other
    /// failures are recorded in the report.
    #[instrument(skip_all, fields(seed = %self.ctx.config.seed))]
    pub async fn run(&self) -> Result<(CrawlReport, Document)> {
        let frontier = self.initial_frontier().await;
        let outcome = self.traverse(frontier, Mode::Extract).await?;
        Ok(outcome.into_document())
    }

    /// Collect in-scope page URLs without extracting content.
    ///
    /// In sitemap mode the filtered sitemap candidates are returned without
    /// fetching anything.
    #[instrument(skip_all, fields(seed = %self.ctx.config.seed))]
    pub async fn discover(&self) -> Result<(CrawlReport, Vec<CrawlTask>)> {
        let started = Instant::now();
        let frontier = self.initial_frontier().await;

        if !frontier.follow_links {
            let report = CrawlReport {
                duration: started.elapsed(),
                sitemap_url: frontier.sitemap_url,
                ..Default::default()
            };
            return Ok((report, frontier.tasks));
        }

        let mut outcome = self.traverse(frontier, Mode::LinksOnly).await?;
        outcome.report.duration = outcome.started.elapsed();
        info!(discovered = outcome.discovered.len(), "discovery finished");
        Ok((outcome.report, outcome.discovered))
    }

    /// Extract exactly the given pages, without following their links.
    #[instrument(skip_all, fields(selected = tasks.len()))]
    pub async fn crawl_selected(&self, tasks: Vec<CrawlTask>) -> Result<(CrawlReport, Document)> {
        let frontier = Frontier {
            tasks,
            follow_links: false,
            sitemap_url: None,
        };
        let outcome = self.traverse(frontier, Mode::Extract).await?;
        Ok(outcome.into_document())
    }

    /// Keep sitemap URLs that fall inside the crawl scope, de-duplicated by
    /// normalized form.
    pub fn sitemap_candidates(&self, urls: &[Url]) -> Vec<Url> {
        let mut seen = HashSet::new();
        urls.iter()
            .filter(|url| match self.ctx.scope.check(url) {
                ScopeDecision::Accept => true,
                ScopeDecision::Reject(reason) => {
                    debug!(%url, %reason, "sitemap URL out of scope");
                    false
                }
            })
            .filter(|url| seen.insert(normalize(url).to_string()))
            .cloned()
            .collect()
    }

    /// Seed alone, or the sitemap candidates when sitemap mode finds any.
    async fn initial_frontier(&self) -> Frontier {
        let config = &self.ctx.config;
        let seed_only = Frontier {
            tasks: vec![CrawlTask::root(config.seed.clone())],
            follow_links: true,
            sitemap_url: None,
        };

        let explicit = match &config.sitemap {
            SitemapMode::Off => return seed_only,
            SitemapMode::Auto => None,
            SitemapMode::Url(url) => Some(url),
        };

        let opts = SitemapOptions {
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
        };

        match webdoc_discovery::discover(&config.seed, explicit, &opts).await {
            Ok(SitemapResult::Found { sitemap_url, urls }) => {
                let candidates = self.sitemap_candidates(&urls);
                if candidates.is_empty() {
                    warn!(sitemap = %sitemap_url, "no sitemap URL in scope, following links instead");
                    return seed_only;
                }
                info!(
                    sitemap = %sitemap_url,
                    listed = urls.len(),
                    in_scope = candidates.len(),
                    "using sitemap frontier"
                );
                Frontier {
                    tasks: candidates.into_iter().map(CrawlTask::root).collect(),
                    follow_links: false,
                    sitemap_url: Some(sitemap_url),
                }
            }
            Ok(SitemapResult::NotFound) => seed_only,
            Err(e) => {
                warn!(error = %e, "sitemap discovery failed, following links instead");
                seed_only
            }
        }
    }

    /// Run the BFS loop until the queue drains or the page budget is spent.
    async fn traverse(&self, frontier: Frontier, mode: Mode) -> Result<Traversal> {
        let config = &self.ctx.config;
        let started = Instant::now();
        let visited = VisitedSet::new();

        let mut queue: VecDeque<CrawlTask> = VecDeque::new();
        for task in frontier.tasks {
            if visited.check_and_mark(&task.url).await {
                queue.push_back(task);
            }
        }

        let mut out = Traversal {
            report: CrawlReport {
                sitemap_url: frontier.sitemap_url,
                ..Default::default()
            },
            builder: DocumentBuilder::new(config.seed.as_str()),
            discovered: Vec::new(),
            started,
        };

        info!(
            max_pages = config.max_pages,
            max_depth = ?config.max_depth,
            concurrency = config.concurrency,
            follow_links = frontier.follow_links,
            "starting crawl"
        );

        let mut workers: JoinSet<TaskOutcome> = JoinSet::new();
        let mut admitted: usize = 0;

        loop {
            while workers.len() < config.concurrency && admitted < config.max_pages {
                let Some(task) = queue.pop_front() else {
                    break;
                };
                if !config.within_depth(task.depth) {
                    debug!(url = %task.url, depth = task.depth, "beyond max depth");
                    out.report.pages_skipped += 1;
                    continue;
                }
                admitted += 1;
                self.progress.page_started(&task.url, task.depth);
                workers.spawn(Arc::clone(&self.ctx).process(task, mode));
            }

            let Some(joined) = workers.join_next().await else {
                break;
            };
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "crawl worker failed");
                    out.report.failures.push(("<worker>".into(), e.to_string()));
                    continue;
                }
            };

            if let Err(e) = self.merge(outcome, &mut out, &mut queue, &visited, frontier.follow_links).await {
                workers.abort_all();
                return Err(e);
            }
        }

        if !queue.is_empty() {
            info!(remaining = queue.len(), max_pages = config.max_pages, "page budget reached");
            out.report.pages_skipped += queue.len();
        }

        Ok(out)
    }

    /// Fold one worker result into the run state and enqueue its links.
    async fn merge(
        &self,
        outcome: TaskOutcome,
        out: &mut Traversal,
        queue: &mut VecDeque<CrawlTask>,
        visited: &VisitedSet,
        follow_links: bool,
    ) -> Result<()> {
        let TaskOutcome {
            task,
            final_url,
            links,
            kind,
        } = outcome;

        let kind = match kind {
            OutcomeKind::Failed(err) => {
                let is_seed = follow_links && task.referrer.is_none();
                return match err {
                    WebdocError::Fetch(source) if is_seed => Err(WebdocError::SeedUnreachable {
                        url: task.url.to_string(),
                        source,
                    }),
                    err => {
                        warn!(url = %task.url, error = %err, "page failed");
                        if !matches!(err, WebdocError::Fetch(_)) {
                            out.report.pages_fetched += 1;
                        }
                        out.report.failures.push((task.url.to_string(), err.to_string()));
                        self.progress.page_finished(&task.url, PageStatus::Failed);
                        self.enqueue_links(&task, links, queue, visited, follow_links).await;
                        Ok(())
                    }
                };
            }
            kind => kind,
        };

        out.report.pages_fetched += 1;

        if let OutcomeKind::OffScope(reason) = &kind {
            debug!(url = %task.url, target = %final_url, %reason, "redirected out of scope");
            out.report.pages_skipped += 1;
            self.progress.page_finished(&task.url, PageStatus::Skipped);
            return Ok(());
        }

        // A redirect onto an already-visited page is a duplicate.
        if normalize(&final_url) != normalize(&task.url) && !visited.check_and_mark(&final_url).await {
            debug!(url = %task.url, target = %final_url, "redirect target already visited");
            out.report.pages_skipped += 1;
            self.progress.page_finished(&task.url, PageStatus::Skipped);
            return Ok(());
        }

        self.enqueue_links(&task, links, queue, visited, follow_links).await;

        let status = match kind {
            OutcomeKind::Included {
                page,
                assets,
                strategy,
            } => {
                for asset in assets {
                    out.builder.add_asset(asset);
                }
                if out.builder.push_page(page) {
                    out.report.pages_included += 1;
                    out.report.primary_strategy.get_or_insert(strategy);
                    PageStatus::Included
                } else {
                    out.report.pages_skipped += 1;
                    PageStatus::Skipped
                }
            }
            OutcomeKind::Filtered(reason) => {
                info!(url = %final_url, %reason, "page filtered out");
                out.report.pages_filtered += 1;
                PageStatus::Filtered
            }
            OutcomeKind::Discovered => {
                out.discovered.push(CrawlTask {
                    url: final_url.clone(),
                    depth: task.depth,
                    referrer: task.referrer.clone(),
                });
                PageStatus::Discovered
            }
            OutcomeKind::OffScope(_) | OutcomeKind::Failed(_) => PageStatus::Failed,
        };

        debug!(url = %final_url, depth = task.depth, ?status, "page done");
        self.progress.page_finished(&final_url, status);
        Ok(())
    }

    /// Enqueue in-scope, unvisited links of `parent` at depth + 1.
    async fn enqueue_links(
        &self,
        parent: &CrawlTask,
        links: Vec<Url>,
        queue: &mut VecDeque<CrawlTask>,
        visited: &VisitedSet,
        follow_links: bool,
    ) {
        if !follow_links || !self.ctx.config.can_descend(parent.depth) {
            return;
        }
        for link in links {
            if let ScopeDecision::Reject(reason) = self.ctx.scope.check(&link) {
                debug!(url = %link, %reason, "out of scope");
                continue;
            }
            if visited.check_and_mark(&link).await {
                queue.push_back(CrawlTask::child(link, parent));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Worker side
// ---------------------------------------------------------------------------

/// Result of processing one task on a worker.
struct TaskOutcome {
    task: CrawlTask,
    /// URL after redirects; the task URL when the fetch failed.
    final_url: Url,
    links: Vec<Url>,
    kind: OutcomeKind,
}

enum OutcomeKind {
    Included {
        page: PageContent,
        assets: Vec<ImageAsset>,
        strategy: &'static str,
    },
    Filtered(RejectReason),
    /// Redirected to a URL outside the crawl scope.
    OffScope(RejectReason),
    Discovered,
    Failed(WebdocError),
}

impl CrawlContext {
    async fn process(self: Arc<Self>, task: CrawlTask, mode: Mode) -> TaskOutcome {
        debug!(url = %task.url, depth = task.depth, "fetching page");

        let response = match self.fetcher.fetch_html(&task.url).await {
            Ok(response) => response,
            Err(e) => {
                return TaskOutcome {
                    final_url: task.url.clone(),
                    task,
                    links: Vec::new(),
                    kind: OutcomeKind::Failed(e.into()),
                };
            }
        };

        // The seed may redirect anywhere; every other page must land in scope.
        let redirected = normalize(&response.final_url) != normalize(&task.url);
        if redirected && normalize(&task.url) != normalize(&self.config.seed) {
            if let ScopeDecision::Reject(reason) = self.scope.check(&response.final_url) {
                return TaskOutcome {
                    final_url: response.final_url,
                    task,
                    links: Vec::new(),
                    kind: OutcomeKind::OffScope(reason),
                };
            }
        }

        match mode {
            Mode::LinksOnly => TaskOutcome {
                links: webdoc_extract::extract_links(&response.body, &response.final_url),
                final_url: response.final_url,
                task,
                kind: OutcomeKind::Discovered,
            },
            Mode::Extract => self.extract_page(task, response).await,
        }
    }

    async fn extract_page(&self, task: CrawlTask, response: HtmlResponse) -> TaskOutcome {
        let HtmlResponse { final_url, body } = response;

        let extracted = match webdoc_extract::extract(&body, &final_url) {
            Ok(extracted) => extracted,
            Err(e) => {
                return TaskOutcome {
                    links: webdoc_extract::extract_links(&body, &final_url),
                    final_url,
                    task,
                    kind: OutcomeKind::Failed(e),
                };
            }
        };
        drop(body);

        let links = extracted.links.clone();
        let category = extracted
            .category
            .clone()
            .or_else(|| self.scope.path_category(&final_url));

        if let ScopeDecision::Reject(reason) =
            self.filter.check(&final_url, &extracted.text(), category.as_deref())
        {
            return TaskOutcome {
                final_url,
                task,
                links,
                kind: OutcomeKind::Filtered(reason),
            };
        }

        let strategy = extracted.strategy;
        let mut page = extracted.into_page(&final_url, task.depth, category);
        let (blocks, assets) = self.resolve_images(std::mem::take(&mut page.blocks), &final_url).await;
        page.blocks = blocks;

        TaskOutcome {
            final_url,
            task,
            links,
            kind: OutcomeKind::Included {
                page,
                assets,
                strategy,
            },
        }
    }

    /// Attach asset ids to image blocks; drop the ones that cannot be resolved.
    async fn resolve_images(&self, blocks: Vec<Block>, page_url: &Url) -> (Vec<Block>, Vec<ImageAsset>) {
        let mut kept = Vec::with_capacity(blocks.len());
        let mut assets = Vec::new();

        for block in blocks {
            let Block::Image(mut image) = block else {
                kept.push(block);
                continue;
            };
            match self.images.resolve(&image, page_url).await {
                Ok(asset) => {
                    image.asset = Some(asset.id.clone());
                    assets.push(asset);
                    kept.push(Block::Image(image));
                }
                Err(e) => warn!(page = %page_url, error = %e, "dropping image"),
            }
        }
        (kept, assets)
    }
}

// ---------------------------------------------------------------------------
// Traversal state
// ---------------------------------------------------------------------------

struct Traversal {
    report: CrawlReport,
    builder: DocumentBuilder,
    discovered: Vec<CrawlTask>,
    started: Instant,
}

impl Traversal {
    fn into_document(mut self) -> (CrawlReport, Document) {
        self.report.duration = self.started.elapsed();
        let report = self.report;
        info!(
            pages_fetched = report.pages_fetched,
            pages_included = report.pages_included,
            pages_filtered = report.pages_filtered,
            pages_skipped = report.pages_skipped,
            failures = report.failures.len(),
            duration_ms = report.duration.as_millis() as u64,
            strategy = report.primary_strategy.unwrap_or("-"),
            "crawl completed"
        );
        (report, self.builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(title: &str, body: &str) -> String {
        format!("<html><head><title>{title}</title></head><body><nav><a href=\"/\">Home</a></nav><main>{body}</main></body></html>")
    }

    async fn mount_page(server: &MockServer, at: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
            .mount(server)
            .await;
    }

    fn config(server: &MockServer, seed_path: &str) -> CrawlConfig {
        let mut config = CrawlConfig::new(Url::parse(&format!("{}{seed_path}", server.uri())).unwrap());
        config.delay = Duration::ZERO;
        config.retries = 0;
        config
    }

    fn page_paths(doc: &Document) -> Vec<String> {
        doc.pages
            .iter()
            .map(|p| Url::parse(&p.url).unwrap().path().to_string())
            .collect()
    }

    #[tokio::test]
    async fn crawl_stays_in_scope_with_depth_one() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/guide/",
            page(
                "Guide",
                r#"<h1>Guide</h1><p><a href="/guide/intro">Intro</a> and <a href="https://other.com/x">elsewhere</a>.</p>
                   <a href="/blog/">Blog</a>"#,
            ),
        )
        .await;
        mount_page(
            &server,
            "/guide/intro",
            page("Intro", r#"<h1>Intro</h1><p>Text.</p><a href="/guide/deeper">Deeper</a>"#),
        )
        .await;

        let mut config = config(&server, "/guide/");
        config.max_depth = Some(1);
        let (report, doc) = Crawler::new(config).unwrap().run().await.unwrap();

        assert_eq!(page_paths(&doc), vec!["/guide/", "/guide/intro"]);
        assert_eq!(report.pages_included, 2);
        assert!(report.failures.is_empty());
        assert!(doc.pages.iter().all(|p| p.depth <= 1));
    }

    #[tokio::test]
    async fn depth_limit_zero_fetches_only_seed() {
        let server = MockServer::start().await;
        mount_page(&server, "/docs/", page("Docs", r#"<p>Root</p><a href="/docs/a">A</a>"#)).await;
        Mock::given(method("GET"))
            .and(path("/docs/a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = config(&server, "/docs/");
        config.max_depth = Some(0);
        let (_, doc) = Crawler::new(config).unwrap().run().await.unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[tokio::test]
    async fn page_budget_caps_document() {
        let server = MockServer::start().await;
        let links: String = (1..=5).map(|i| format!(r#"<a href="/docs/p{i}">P{i}</a> "#)).collect();
        mount_page(&server, "/docs/", page("Docs", &format!("<p>Index {links}</p>"))).await;
        for i in 1..=5 {
            mount_page(&server, &format!("/docs/p{i}"), page(&format!("P{i}"), "<p>Body</p>")).await;
        }

        let mut config = config(&server, "/docs/");
        config.max_pages = 3;
        let (report, doc) = Crawler::new(config).unwrap().run().await.unwrap();

        assert_eq!(doc.len(), 3);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.pages_skipped, 3);
    }

    #[tokio::test]
    async fn normalized_duplicates_fetched_once() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/docs/",
            page(
                "Docs",
                r#"<p>Links</p>
                <a href="/docs/a">1</a><a href="/docs/a/">2</a><a href="/docs/a#part">3</a>
                <a href="/docs/./a">4</a><a href="/docs/a?utm_source=feed">5</a>"#,
            ),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/docs/a"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page("A", "<p>A</p>"), "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let (report, doc) = Crawler::new(config(&server, "/docs/")).unwrap().run().await.unwrap();
        assert_eq!(doc.len(), 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn exclude_keyword_wins_and_links_still_followed() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/docs/",
            page("Welcome", r#"<p>Start here.</p><a href="/docs/install">I</a><a href="/docs/old-install">O</a>"#),
        )
        .await;
        mount_page(&server, "/docs/install", page("Install", "<p>Install guide.</p>")).await;
        mount_page(
            &server,
            "/docs/old-install",
            page("Old", "<p>Install the old way. This is deprecated.</p>"),
        )
        .await;

        let mut config = config(&server, "/docs/");
        config.filters.contains = vec!["install".into()];
        config.filters.not_contains = vec!["deprecated".into()];
        let (report, doc) = Crawler::new(config).unwrap().run().await.unwrap();

        assert_eq!(page_paths(&doc), vec!["/docs/install"]);
        assert_eq!(report.pages_filtered, 2);
    }

    #[tokio::test]
    async fn missing_image_drops_block_keeps_page() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/docs/",
            page("Docs", r#"<p>Before.</p><img src="/docs/img/missing.png" alt="Missing"><p>After.</p>"#),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/docs/img/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (_, doc) = Crawler::new(config(&server, "/docs/")).unwrap().run().await.unwrap();
        assert_eq!(doc.len(), 1);
        let blocks = &doc.pages[0].blocks;
        assert!(!blocks.iter().any(|b| matches!(b, Block::Image(_))));
        assert!(blocks.contains(&Block::Paragraph { text: "After.".into() }));
        assert!(doc.assets.is_empty());
    }

    #[tokio::test]
    async fn redirect_out_of_scope_is_skipped() {
        let server = MockServer::start().await;
        mount_page(&server, "/docs/", page("Docs", r#"<p>Root</p><a href="/docs/moved">Moved</a>"#)).await;
        Mock::given(method("GET"))
            .and(path("/docs/moved"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/blog/secret"))
            .mount(&server)
            .await;
        mount_page(
            &server,
            "/blog/secret",
            page("Secret", r#"<p>Blog post.</p><a href="/docs/hidden">H</a>"#),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/docs/hidden"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (report, doc) = Crawler::new(config(&server, "/docs/")).unwrap().run().await.unwrap();
        assert_eq!(page_paths(&doc), vec!["/docs/"]);
        assert_eq!(report.pages_included, 1);
        assert_eq!(report.pages_skipped, 1);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn unreachable_seed_is_fatal() {
        let server = MockServer::start().await;
        let err = Crawler::new(config(&server, "/docs/")).unwrap().run().await.unwrap_err();
        assert!(matches!(err, WebdocError::SeedUnreachable { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn failed_child_page_is_recorded() {
        let server = MockServer::start().await;
        mount_page(&server, "/docs/", page("Docs", r#"<p>x</p><a href="/docs/broken">B</a>"#)).await;
        Mock::given(method("GET"))
            .and(path("/docs/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (report, doc) = Crawler::new(config(&server, "/docs/")).unwrap().run().await.unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].0.ends_with("/docs/broken"));
    }

    fn sitemap_fixture(base: &str) -> String {
        let path = format!("{}/../../../fixtures/sitemap/urlset.xml", env!("CARGO_MANIFEST_DIR"));
        std::fs::read_to_string(&path)
            .expect("read sitemap fixture")
            .replace("{{BASE}}", base)
    }

    async fn mount_sitemap(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(sitemap_fixture(&server.uri())),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sitemap_candidates_filtered_to_scope() {
        let server = MockServer::start().await;
        mount_sitemap(&server).await;

        let mut config = config(&server, "/guide/");
        config.sitemap = SitemapMode::Auto;
        let (report, tasks) = Crawler::new(config).unwrap().discover().await.unwrap();

        let paths: Vec<&str> = tasks.iter().map(|t| t.url.path()).collect();
        assert_eq!(paths, vec!["/guide/", "/guide/intro", "/guide/setup"]);
        assert_eq!(report.sitemap_url.unwrap().path(), "/sitemap.xml");
        assert_eq!(report.pages_fetched, 0);
    }

    #[tokio::test]
    async fn sitemap_frontier_does_not_follow_links() {
        let server = MockServer::start().await;
        mount_sitemap(&server).await;
        for p in ["/guide/", "/guide/intro", "/guide/setup"] {
            mount_page(&server, p, page(p, r#"<p>Body</p><a href="/guide/unlisted">U</a>"#)).await;
        }
        Mock::given(method("GET"))
            .and(path("/guide/unlisted"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = config(&server, "/guide/");
        config.sitemap = SitemapMode::Auto;
        let (_, doc) = Crawler::new(config).unwrap().run().await.unwrap();
        assert_eq!(doc.len(), 3);
    }

    #[tokio::test]
    async fn missing_sitemap_falls_back_to_links() {
        let server = MockServer::start().await;
        mount_page(&server, "/docs/", page("Docs", r#"<p>x</p><a href="/docs/a">A</a>"#)).await;
        mount_page(&server, "/docs/a", page("A", "<p>A</p>")).await;

        let mut config = config(&server, "/docs/");
        config.sitemap = SitemapMode::Auto;
        let (report, doc) = Crawler::new(config).unwrap().run().await.unwrap();
        assert_eq!(doc.len(), 2);
        assert!(report.sitemap_url.is_none());
    }

    #[tokio::test]
    async fn discover_then_crawl_selected() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/docs/",
            page("Docs", r#"<p>x</p><a href="/docs/a">A</a><a href="/docs/b">B</a>"#),
        )
        .await;
        mount_page(&server, "/docs/a", page("A", "<p>Alpha</p>")).await;
        mount_page(&server, "/docs/b", page("B", "<p>Beta</p>")).await;

        let crawler = Crawler::new(config(&server, "/docs/")).unwrap();
        let (_, tasks) = crawler.discover().await.unwrap();
        assert_eq!(tasks.len(), 3);

        let selected: Vec<CrawlTask> = tasks.into_iter().filter(|t| t.url.path() == "/docs/b").collect();
        let (_, doc) = crawler.crawl_selected(selected).await.unwrap();
        assert_eq!(page_paths(&doc), vec!["/docs/b"]);
        assert_eq!(doc.pages[0].title, "B");
    }

    #[tokio::test]
    async fn concurrent_workers_keep_urls_unique() {
        let server = MockServer::start().await;
        let links: String = (1..=6).map(|i| format!(r#"<a href="/docs/p{i}">P{i}</a>"#)).collect();
        mount_page(&server, "/docs/", page("Docs", &format!("<p>Index</p>{links}"))).await;
        for i in 1..=6 {
            mount_page(&server, &format!("/docs/p{i}"), page("P", &format!("<p>x</p>{links}"))).await;
        }

        let mut config = config(&server, "/docs/");
        config.concurrency = 4;
        let (_, doc) = Crawler::new(config).unwrap().run().await.unwrap();

        let mut urls: Vec<&str> = doc.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls.len(), 7);
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 7);
    }
}
