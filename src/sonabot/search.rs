use std::future::Future;

use anyhow::{format_err, Context as _, Result};
use log::{debug, error, warn};
use reqwest::{Client, StatusCode, Url};
use scraper::{ElementRef, Html, Selector};

pub const NOTHING_FOUND: &str = "Seems like there wasn't anything to find. Sorry.";

const MAX_SNIPPET_CHARS: usize = 200;

/// Longest message Discord accepts.
const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEngine {
    Mdn,
    GoPackages,
    GitHub,
}

impl SearchEngine {
    pub fn all() -> [SearchEngine; 3] {
        [SearchEngine::Mdn, SearchEngine::GoPackages, SearchEngine::GitHub]
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SearchEngine::Mdn => "mdn",
            SearchEngine::GoPackages => "go",
            SearchEngine::GitHub => "gh",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SearchEngine::Mdn => "Searches Mozilla Developer Network and returns link to results",
            SearchEngine::GoPackages => {
                "Searches Go Pkg for relevant Go packages and returns the first 3 results"
            }
            SearchEngine::GitHub => {
                "Searches Github for relevant git repositories and returns the first 3 results"
            }
        }
    }

    fn location(&self) -> (&'static str, &'static str) {
        match self {
            SearchEngine::Mdn => ("developer.mozilla.org", "/en-US/search"),
            SearchEngine::GoPackages => ("pkg.go.dev", "/search"),
            SearchEngine::GitHub => ("github.com", "/search"),
        }
    }

    /// Search page for `terms`, passed as a single form-encoded `q` parameter.
    pub fn query_url(&self, terms: &str) -> Result<Url> {
        let (host, path) = self.location();
        let query = serde_urlencoded::to_string([("q", terms)])?;
        Url::parse(&format!("https://{host}{path}?{query}"))
            .with_context(|| format!("Invalid search url for {}", self.keyword()))
    }

    /// `None` for engines whose result pages are not scraped; those get a bare link.
    pub fn scrape_rule(&self) -> Option<ScrapeRule> {
        match self {
            SearchEngine::Mdn => None,
            SearchEngine::GoPackages => Some(ScrapeRule {
                header: "Here's what I found at pkg.go.dev...",
                result: ".SearchSnippet, .LegacySearchSnippet",
                link: "a[href]",
                snippet: "p.SearchSnippet-synopsis",
            }),
            SearchEngine::GitHub => Some(ScrapeRule {
                header: "Here's what I found at the ol' Github...",
                result: ".repo-list-item",
                link: "a[href]",
                snippet: "p",
            }),
        }
    }
}

/// CSS selectors locating results on an engine's search page.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeRule {
    pub header: &'static str,
    pub result: &'static str,
    pub link: &'static str,
    pub snippet: &'static str,
}

pub struct Page {
    pub status: StatusCode,
    pub body: String,
}

pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Page>> + Send;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build http client")?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page> {
        debug!("GET {url}");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(Page { status, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReply {
    pub url: Url,
    pub summary: Option<String>,
}

impl SearchReply {
    /// Scraped summary when there is one, the search page link otherwise.
    pub fn into_text(self) -> String {
        self.summary.unwrap_or_else(|| self.url.to_string())
    }
}

pub struct SearchExecutor<F> {
    fetcher: F,
    max_results: usize,
}

impl<F: PageFetcher> SearchExecutor<F> {
    pub fn new(fetcher: F, max_results: usize) -> Self {
        Self {
            fetcher,
            max_results,
        }
    }

    /// Fetch and scrape failures are logged and reported as an empty result set.
    pub async fn search(&self, engine: SearchEngine, terms: &str) -> Result<SearchReply> {
        let Some(rule) = engine.scrape_rule() else {
            let url = link_within_limit(engine, terms)?;
            return Ok(SearchReply { url, summary: None });
        };
        let url = engine.query_url(terms)?;
        let summary = match self.fetcher.fetch(&url).await {
            Ok(page) => {
                if page.status != StatusCode::OK {
                    warn!("Search {url}: status code error: {}", page.status);
                }
                summarize(&rule, &url, &page.body, self.max_results)
                    .inspect_err(|e| error!("Search {url}: {e:#}"))
                    .unwrap_or_else(|_| String::from(NOTHING_FOUND))
            }
            Err(e) => {
                error!("Search {url}: {e:#}");
                String::from(NOTHING_FOUND)
            }
        };
        Ok(SearchReply {
            url,
            summary: Some(summary),
        })
    }
}

/// Drops trailing characters of `terms` until the search link fits in one message.
fn link_within_limit(engine: SearchEngine, terms: &str) -> Result<Url> {
    let mut terms = terms;
    loop {
        let url = engine.query_url(terms)?;
        if url.as_str().len() <= MAX_MESSAGE_CHARS || terms.is_empty() {
            return Ok(url);
        }
        let end = terms.char_indices().last().map_or(0, |(i, _)| i);
        terms = &terms[..end];
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| format_err!("Bad selector {css:?}: {e}"))
}

pub fn summarize(rule: &ScrapeRule, url: &Url, body: &str, max_results: usize) -> Result<String> {
    let result = selector(rule.result)?;
    let link = selector(rule.link)?;
    let snippet = selector(rule.snippet)?;

    let document = Html::parse_document(body);
    let entries: Vec<String> = document
        .select(&result)
        .take(max_results)
        .filter_map(|item| {
            let href = item.select(&link).next()?.value().attr("href")?;
            let text = item
                .select(&snippet)
                .next()
                .map(element_text)
                .unwrap_or_default();
            Some(format_entry(url, href, &text))
        })
        .collect();

    if entries.is_empty() {
        return Ok(String::from(NOTHING_FOUND));
    }
    let mut lines = vec![rule.header.to_string()];
    lines.extend(entries);
    Ok(lines.join("\n\n"))
}

fn element_text(element: ElementRef) -> String {
    let text: String = element.text().collect();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > MAX_SNIPPET_CHARS {
        let mut truncated: String = text.chars().take(MAX_SNIPPET_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        text
    }
}

fn format_entry(url: &Url, href: &str, snippet: &str) -> String {
    let link = url
        .join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", url.origin().ascii_serialization(), href));
    if snippet.is_empty() {
        link
    } else {
        format!("{link} - {snippet}")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const GITHUB_PAGE: &str = r#"
        <html><body><ul class="repo-list">
          <li class="repo-list-item">
            <a href="/rust-lang/governor">rust-lang/governor</a>
            <p>A <em>rate</em>
               <em>limiting</em> library</p>
          </li>
          <li class="repo-list-item">
            <a href="/tower-rs/tower">tower-rs/tower</a>
            <p>Middleware with rate limiting</p>
          </li>
        </ul></body></html>"#;

    const GO_PAGE: &str = r#"
        <div class="SearchResults">
          <div class="SearchSnippet"><h2><a href="/net/http">net/http</a></h2>
            <p class="SearchSnippet-synopsis">Package http provides HTTP client and server.</p></div>
          <div class="SearchSnippet"><h2><a href="/github.com/gorilla/mux">mux</a></h2>
            <p class="SearchSnippet-synopsis">A powerful URL router.</p></div>
          <div class="SearchSnippet"><h2>no link here</h2></div>
          <div class="SearchSnippet"><h2><a href="/fourth">fourth</a></h2></div>
        </div>"#;

    struct CannedFetcher {
        status: StatusCode,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl CannedFetcher {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PageFetcher for CannedFetcher {
        async fn fetch(&self, _url: &Url) -> Result<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    struct BrokenFetcher;

    impl PageFetcher for BrokenFetcher {
        async fn fetch(&self, _url: &Url) -> Result<Page> {
            Err(format_err!("connection reset"))
        }
    }

    #[test]
    fn query_urls() {
        assert_eq!(
            SearchEngine::GitHub
                .query_url("rate limiting")
                .unwrap()
                .as_str(),
            "https://github.com/search?q=rate+limiting"
        );
        assert_eq!(
            SearchEngine::GoPackages.query_url("a&b").unwrap().as_str(),
            "https://pkg.go.dev/search?q=a%26b"
        );
        assert_eq!(
            SearchEngine::Mdn.query_url("").unwrap().as_str(),
            "https://developer.mozilla.org/en-US/search?q="
        );
    }

    #[tokio::test]
    async fn github_summary() {
        let executor = SearchExecutor::new(CannedFetcher::new(StatusCode::OK, GITHUB_PAGE), 3);
        let reply = executor
            .search(SearchEngine::GitHub, "rate limiting")
            .await
            .unwrap();
        assert_eq!(reply.url.as_str(), "https://github.com/search?q=rate+limiting");
        let text = reply.into_text();
        let parts: Vec<_> = text.split("\n\n").collect();
        assert_eq!(
            parts,
            [
                "Here's what I found at the ol' Github...",
                "https://github.com/rust-lang/governor - A rate limiting library",
                "https://github.com/tower-rs/tower - Middleware with rate limiting",
            ]
        );
    }

    #[tokio::test]
    async fn go_summary_is_bounded() {
        let executor = SearchExecutor::new(CannedFetcher::new(StatusCode::OK, GO_PAGE), 3);
        let text = executor
            .search(SearchEngine::GoPackages, "router")
            .await
            .unwrap()
            .into_text();
        // The third result has no link and still counts against the limit.
        assert_eq!(
            text,
            "Here's what I found at pkg.go.dev...\n\n\
             https://pkg.go.dev/net/http - Package http provides HTTP client and server.\n\n\
             https://pkg.go.dev/github.com/gorilla/mux - A powerful URL router."
        );
    }

    #[tokio::test]
    async fn mdn_is_not_fetched() {
        let fetcher = CannedFetcher::new(StatusCode::OK, GITHUB_PAGE);
        let executor = SearchExecutor::new(fetcher, 3);
        let reply = executor.search(SearchEngine::Mdn, "flexbox").await.unwrap();
        assert_eq!(reply.summary, None);
        assert_eq!(executor.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            reply.into_text(),
            "https://developer.mozilla.org/en-US/search?q=flexbox"
        );
    }

    #[tokio::test]
    async fn long_mdn_link_fits_in_a_message() {
        let terms = "漢".repeat(600);
        let executor = SearchExecutor::new(CannedFetcher::new(StatusCode::OK, ""), 3);
        let reply = executor.search(SearchEngine::Mdn, &terms).await.unwrap();
        let (_, kept) = reply.url.query_pairs().next().unwrap();
        assert!(!kept.is_empty());
        assert!(terms.starts_with(kept.as_ref()));
        let text = reply.into_text();
        assert!(text.len() <= MAX_MESSAGE_CHARS, "{} chars", text.len());
        assert!(text.starts_with("https://developer.mozilla.org/en-US/search?q=%E6%BC%A2"));
    }

    #[tokio::test]
    async fn error_status_yields_nothing_found() {
        let executor = SearchExecutor::new(
            CannedFetcher::new(StatusCode::TOO_MANY_REQUESTS, "<h1>Slow down</h1>"),
            3,
        );
        let text = executor
            .search(SearchEngine::GitHub, "x")
            .await
            .unwrap()
            .into_text();
        assert_eq!(text, NOTHING_FOUND);
    }

    #[tokio::test]
    async fn empty_page_yields_nothing_found() {
        let executor = SearchExecutor::new(CannedFetcher::new(StatusCode::OK, ""), 3);
        let text = executor
            .search(SearchEngine::GoPackages, "")
            .await
            .unwrap()
            .into_text();
        assert_eq!(text, NOTHING_FOUND);
    }

    #[tokio::test]
    async fn fetch_failure_yields_nothing_found() {
        let executor = SearchExecutor::new(BrokenFetcher, 3);
        let text = executor
            .search(SearchEngine::GitHub, "x")
            .await
            .unwrap()
            .into_text();
        assert_eq!(text, NOTHING_FOUND);
    }

    #[test]
    fn long_snippets_are_truncated() {
        let body = format!(
            r#"<div class="repo-list-item"><a href="/a/b">a/b</a><p>{}</p></div>"#,
            "x".repeat(500)
        );
        let rule = SearchEngine::GitHub.scrape_rule().unwrap();
        let url = SearchEngine::GitHub.query_url("x").unwrap();
        let text = summarize(&rule, &url, &body, 3).unwrap();
        let entry = text.split("\n\n").nth(1).unwrap();
        assert_eq!(
            entry,
            format!("https://github.com/a/b - {}...", "x".repeat(200))
        );
    }

    #[test]
    fn absolute_links_are_kept() {
        let body = r#"<div class="repo-list-item"><a href="https://example.com/x">x</a></div>"#;
        let rule = SearchEngine::GitHub.scrape_rule().unwrap();
        let url = SearchEngine::GitHub.query_url("x").unwrap();
        let text = summarize(&rule, &url, body, 3).unwrap();
        assert_eq!(
            text,
            "Here's what I found at the ol' Github...\n\nhttps://example.com/x"
        );
    }
}
