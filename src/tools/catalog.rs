//! Catalog search tool: scrapes product listings from the restaurant supply
//! store's search results page through a real browser.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::browser::{BrowserError, BrowserLauncher, BrowserSession, SessionGuard};
use super::{string_arg, Tool, ToolError};
use crate::config::CatalogConfig;

/// Tool name constant
pub const CATALOG_SEARCH: &str = "webstaurantstore";

const RESULT_CARD: &str = ".product-box-container";

const NO_PRODUCTS: &str = "No products found. Please check the query or website structure.";

static CARD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(RESULT_CARD).expect("valid card selector"));
static DESCRIPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"span[data-testid="itemDescription"]"#).expect("valid description selector")
});
static PRICE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-testid="price"]"#).expect("valid price selector"));
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[data-testid="itemLink"]"#).expect("valid link selector"));

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub description: String,
    pub price: String,
    pub product_link: String,
}

#[derive(Debug, Error)]
enum ScrapeError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Failed to load product elements after {0} retries.")]
    RetriesExhausted(u32),
}

/// Search the catalog and return up to `limit` products.
pub struct CatalogSearch {
    launcher: Arc<dyn BrowserLauncher>,
    base_url: String,
    default_limit: usize,
    max_retries: u32,
    wait_timeout: Duration,
    retry_backoff: Duration,
}

impl CatalogSearch {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: &CatalogConfig) -> Self {
        Self {
            launcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_limit: config.default_limit,
            max_retries: config.max_retries.max(1),
            wait_timeout: config.wait_timeout,
            retry_backoff: config.retry_backoff,
        }
    }

    /// Results page for `query`; spaces become hyphens.
    pub fn search_url(&self, query: &str) -> String {
        let segment = query.trim().replace(' ', "-");
        format!("{}/search/{}.html", self.base_url, urlencoding::encode(&segment))
    }

    async fn scrape(
        &self,
        guard: &mut SessionGuard,
        url: &str,
        limit: usize,
    ) -> Result<Vec<Product>, ScrapeError> {
        let session = guard.session()?;
        session.goto(url).await?;
        self.wait_for_results(session).await?;
        let html = session.page_source().await?;
        Ok(extract_products(&html, url, limit))
    }

    async fn wait_for_results(&self, session: &mut dyn BrowserSession) -> Result<(), ScrapeError> {
        let mut attempt = 0;
        loop {
            match session.wait_for(RESULT_CARD, self.wait_timeout).await {
                Ok(()) => return Ok(()),
                Err(e @ BrowserError::Timeout { .. }) => {
                    attempt += 1;
                    tracing::warn!(
                        "Retry {}/{} due to timeout: {}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    if attempt >= self.max_retries {
                        return Err(ScrapeError::RetriesExhausted(self.max_retries));
                    }
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Tool for CatalogSearch {
    fn name(&self) -> &str {
        CATALOG_SEARCH
    }

    fn description(&self) -> &str {
        "Scrapes the WebstaurantStore website for product data based on the search term. Returns the products found with description, price and product link."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search term used to find products"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of products to return (default: 10)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let query = string_arg(&args, &["query"]).ok_or_else(|| {
            ToolError::InvalidArguments("Query term cannot be None or empty.".to_string())
        })?;
        let limit = args
            .get("limit")
            .or_else(|| args.get("product_limit"))
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(self.default_limit)
            .max(1);

        let url = self.search_url(query);

        let session = self
            .launcher
            .launch()
            .await
            .map_err(|e| ToolError::Failed(format!("Error initializing WebDriver: {}", e)))?;
        let mut guard = SessionGuard::new(session);

        tracing::info!("Navigating to URL: {}", url);
        let outcome = self.scrape(&mut guard, &url, limit).await;
        guard.release().await;

        let products =
            outcome.map_err(|e| ToolError::Failed(format!("Error during scraping: {}", e)))?;
        if products.is_empty() {
            return Ok(NO_PRODUCTS.to_string());
        }

        tracing::info!(count = products.len(), "Extracted products");
        serde_json::to_string_pretty(&products)
            .map_err(|e| ToolError::Failed(format!("Error during scraping: {}", e)))
    }
}

/// Pull product cards out of a results page. Cards missing any field are skipped.
pub fn extract_products(html: &str, page_url: &str, limit: usize) -> Vec<Product> {
    let document = Html::parse_document(html);
    let base = url::Url::parse(page_url).ok();
    let mut products = Vec::new();

    for card in document.select(&CARD_SELECTOR) {
        let description = card.select(&DESCRIPTION_SELECTOR).next().map(element_text);
        let price = card.select(&PRICE_SELECTOR).next().map(element_text);
        let href = card
            .select(&LINK_SELECTOR)
            .next()
            .and_then(|a| a.value().attr("href"));

        let (Some(description), Some(price), Some(href)) = (description, price, href) else {
            tracing::warn!("Error extracting product details: incomplete product card");
            continue;
        };

        let product_link = match &base {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        };

        products.push(Product {
            description,
            price,
            product_link,
        });
        if products.len() >= limit {
            break;
        }
    }

    products
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="product-box-container">
            <a data-testid="itemLink" href="/regency-2-compartment-sink/600S21818.html">
              <span data-testid="itemDescription">Regency 2 Compartment
                Sink</span>
            </a>
            <p data-testid="price">$519.99/Each</p>
          </div>
          <div class="product-box-container">
            <span data-testid="itemDescription">Card without a link</span>
            <p data-testid="price">$1.00</p>
          </div>
          <div class="product-box-container">
            <a data-testid="itemLink" href="https://cdn.example.com/steelton.html">
              <span data-testid="itemDescription">Steelton Sink</span>
            </a>
            <p data-testid="price">$299.00/Each</p>
          </div>
          <div class="product-box-container">
            <a data-testid="itemLink" href="/third.html">
              <span data-testid="itemDescription">Third Sink</span>
            </a>
            <p data-testid="price">$99.00/Each</p>
          </div>
        </body></html>
    "#;

    #[derive(Default)]
    struct BrowserLog {
        launches: AtomicUsize,
        waits: AtomicUsize,
        quits: AtomicUsize,
        visited: Mutex<Vec<String>>,
    }

    struct FakeLauncher {
        log: Arc<BrowserLog>,
        page: Option<&'static str>,
        fail_launch: bool,
    }

    struct FakeSession {
        log: Arc<BrowserLog>,
        page: Option<&'static str>,
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
            self.log.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail_launch {
                return Err(BrowserError::WebDriver("session not created".to_string()));
            }
            Ok(Box::new(FakeSession {
                log: Arc::clone(&self.log),
                page: self.page,
            }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
            self.log.visited.lock().unwrap().push(url.to_string());
            Ok(())
        }

        async fn wait_for(
            &mut self,
            selector: &str,
            timeout: Duration,
        ) -> Result<(), BrowserError> {
            self.log.waits.fetch_add(1, Ordering::SeqCst);
            match self.page {
                Some(_) => Ok(()),
                None => Err(BrowserError::Timeout {
                    selector: selector.to_string(),
                    waited: timeout,
                }),
            }
        }

        async fn page_source(&mut self) -> Result<String, BrowserError> {
            Ok(self.page.unwrap_or_default().to_string())
        }

        async fn quit(&mut self) -> Result<(), BrowserError> {
            self.log.quits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn tool(page: Option<&'static str>, fail_launch: bool) -> (CatalogSearch, Arc<BrowserLog>) {
        let log = Arc::new(BrowserLog::default());
        let launcher = Arc::new(FakeLauncher {
            log: Arc::clone(&log),
            page,
            fail_launch,
        });
        let config = CatalogConfig {
            base_url: "https://www.webstaurantstore.com".to_string(),
            retry_backoff: Duration::ZERO,
            wait_timeout: Duration::from_millis(10),
            ..CatalogConfig::default()
        };
        (CatalogSearch::new(launcher, &config), log)
    }

    #[test]
    fn search_url_hyphenates_spaces() {
        let (search, _) = tool(None, false);
        assert_eq!(
            search.search_url(" 2 compartment sinks "),
            "https://www.webstaurantstore.com/search/2-compartment-sinks.html"
        );
    }

    #[test]
    fn extraction_skips_incomplete_cards_and_resolves_links() {
        let products = extract_products(
            RESULTS_PAGE,
            "https://www.webstaurantstore.com/search/sinks.html",
            10,
        );
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].description, "Regency 2 Compartment Sink");
        assert_eq!(products[0].price, "$519.99/Each");
        assert_eq!(
            products[0].product_link,
            "https://www.webstaurantstore.com/regency-2-compartment-sink/600S21818.html"
        );
        assert_eq!(products[1].product_link, "https://cdn.example.com/steelton.html");
    }

    #[test]
    fn extraction_respects_limit() {
        let products = extract_products(RESULTS_PAGE, "https://www.webstaurantstore.com/", 2);
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].description, "Steelton Sink");
    }

    #[tokio::test]
    async fn empty_query_makes_no_browser_calls() {
        let (search, log) = tool(Some(RESULTS_PAGE), false);
        for args in [json!({}), json!({ "query": "" }), json!({ "query": "   " })] {
            let err = search.execute(args).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
            assert!(err.to_string().contains("Query term cannot be None or empty"));
        }
        assert_eq!(log.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retry_exhaustion_reports_once_and_releases_browser() {
        let (search, log) = tool(None, false);
        let err = search.execute(json!({ "query": "sinks" })).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Error during scraping: Failed to load product elements after 3 retries."
        );
        assert_eq!(log.waits.load(Ordering::SeqCst), 3);
        assert_eq!(log.launches.load(Ordering::SeqCst), 1);
        assert_eq!(log.quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_search_returns_products_and_releases_browser() {
        let (search, log) = tool(Some(RESULTS_PAGE), false);
        let out = search
            .execute(json!({ "query": "2 compartment sinks", "limit": 1 }))
            .await
            .unwrap();

        let products: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["price"], "$519.99/Each");
        assert_eq!(
            log.visited.lock().unwrap().as_slice(),
            ["https://www.webstaurantstore.com/search/2-compartment-sinks.html"]
        );
        assert_eq!(log.quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn page_without_products_is_not_an_error() {
        let (search, log) = tool(Some("<html><body><p>Nothing</p></body></html>"), false);
        let out = search.execute(json!({ "query": "unobtainium" })).await.unwrap();
        assert_eq!(out, NO_PRODUCTS);
        assert_eq!(log.quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn launch_failure_is_reported_as_text() {
        let (search, log) = tool(Some(RESULTS_PAGE), true);
        let err = search.execute(json!({ "query": "sinks" })).await.unwrap_err();
        assert!(err.to_string().starts_with("Error initializing WebDriver:"));
        assert_eq!(log.quits.load(Ordering::SeqCst), 0);
    }
}
