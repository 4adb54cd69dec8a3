//! Spec sheet tool: finds a vehicle's product page, follows its "Floor Plan"
//! link and returns the text of the linked PDF.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use thiserror::Error;

use super::pdf::{self, PdfError};
use super::{string_arg, Tool, ToolError};
use crate::config::SpecSheetConfig;

/// Tool name constant
pub const SPEC_SHEET: &str = "icecastlefh";

const UPLOADS_PATH: &str = "/wp-content/uploads/";
const LINK_LABEL: &str = "Floor Plan";

static FOOT_BY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"′\s*x\s*").expect("valid regex"));
static SPACED_X: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+x\s+").expect("valid regex"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\-]").expect("valid regex"));
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Turn a display name into the product page slug used by the vehicle site.
///
/// `6.5′ x 14′ Hunter's Haven` becomes `6-5-x-14-hunters-haven`.
pub fn slugify(name: &str) -> String {
    let slug = name.to_lowercase().replace('.', "-");
    let slug = FOOT_BY.replace_all(&slug, "-x-");
    let slug = slug.replace('\'', "");
    let slug = SPACED_X.replace_all(&slug, "x");
    let slug = slug.replace(' ', "-");
    let slug = DISALLOWED.replace_all(&slug, "");
    let slug = HYPHEN_RUNS.replace_all(&slug, "-");
    slug.trim_matches('-').to_string()
}

/// Find the floor plan document linked from a product page.
///
/// Relative links are resolved against `base_url`.
pub fn find_floor_plan_link(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let href = document.select(&ANCHOR).find_map(|a| {
        let href = a.value().attr("href")?;
        let label = a.text().collect::<String>();
        (href.contains(UPLOADS_PATH) && label.contains(LINK_LABEL)).then(|| href.to_string())
    })?;

    if href.starts_with("http") {
        return Some(href);
    }
    let joined = url::Url::parse(base_url)
        .and_then(|base| base.join(&href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", base_url.trim_end_matches('/'), href));
    Some(joined)
}

#[derive(Debug, Error)]
enum FetchError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("PDF link not found on the product page.")]
    LinkNotFound,

    #[error("{0}")]
    Pdf(#[from] PdfError),

    #[error("PDF extraction task failed: {0}")]
    Extraction(#[from] tokio::task::JoinError),
}

impl FetchError {
    fn describe(&self, url: &str) -> String {
        match self {
            FetchError::Network(e) => format!("Error fetching data: {}\nURL: {}", e, url),
            FetchError::LinkNotFound => format!("{} URL: {}", self, url),
            FetchError::Pdf(_) | FetchError::Extraction(_) => {
                format!("An unexpected error occurred: {}\nURL: {}", self, url)
            }
        }
    }
}

/// Fetch floor plan details for a vehicle by name.
pub struct SpecSheetFetch {
    client: reqwest::Client,
    base_url: String,
}

impl SpecSheetFetch {
    pub fn new(config: &SpecSheetConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; ProductAgent/0.1)")
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn product_url(&self, name: &str) -> String {
        format!("{}/product/{}", self.base_url, slugify(name))
    }

    async fn fetch_floor_plan(&self, product_url: &str) -> Result<String, FetchError> {
        let page = self
            .client
            .get(product_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let pdf_url =
            find_floor_plan_link(&page, &self.base_url).ok_or(FetchError::LinkNotFound)?;
        tracing::info!("PDF URL found: {}", pdf_url);

        let bytes = self
            .client
            .get(&pdf_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let pages = tokio::task::spawn_blocking(move || pdf::extract_pages(&bytes)).await??;
        Ok(pdf::join_pages(&pages))
    }
}

#[async_trait]
impl Tool for SpecSheetFetch {
    fn name(&self) -> &str {
        SPEC_SHEET
    }

    fn description(&self) -> &str {
        "Fetches the floor plan and standard options for an Ice Castle vehicle by name (for example \"8′ x 17′ American Eagle\"). Returns the extracted floor plan text along with the product URL it came from."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The vehicle name, including its size, e.g. \"6.5′ x 14′ Hunter's Haven\""
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let name = string_arg(&args, &["name", "vehicle_name"]).ok_or_else(|| {
            ToolError::InvalidArguments("Vehicle name cannot be None or empty.".to_string())
        })?;

        let product_url = self.product_url(name);
        tracing::info!("Fetching data from: {}", product_url);

        match self.fetch_floor_plan(&product_url).await {
            Ok(text) if text.is_empty() => Ok(format!(
                "Product URL: {}\n\nNo text found in the PDF.",
                product_url
            )),
            Ok(text) => Ok(format!("Product URL: {}\n\n{}", product_url, text)),
            Err(e) => Err(ToolError::Failed(e.describe(&product_url))),
        }
    }
}
