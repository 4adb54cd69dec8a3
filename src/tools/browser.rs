//! Browser automation over the W3C WebDriver protocol.
//!
//! A session is created per tool invocation and wrapped in a [`SessionGuard`]
//! so it is closed on every exit path.

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::error::{CmdError, NewSessionError};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Poll interval while waiting for elements to appear.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Could not start browser session: {0}")]
    Session(#[from] NewSessionError),

    #[error("WebDriver command failed: {0}")]
    Command(#[from] CmdError),

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("Timed out after {}s waiting for '{selector}'", .waited.as_secs())]
    Timeout { selector: String, waited: Duration },
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A live browser session.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Wait until at least one element matches `selector`.
    ///
    /// Returns `BrowserError::Timeout` when nothing appears within `timeout`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn page_source(&mut self) -> Result<String, BrowserError>;

    async fn quit(&mut self) -> Result<(), BrowserError>;
}

/// Owns a session until [`SessionGuard::release`] is awaited.
///
/// Dropping an unreleased guard (panic, cancelled future) closes the session
/// on the current tokio runtime in the background.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&mut self) -> Result<&mut (dyn BrowserSession + 'static), BrowserError> {
        self.session
            .as_deref_mut()
            .ok_or_else(|| BrowserError::WebDriver("session already released".to_string()))
    }

    /// Close the session and wait for the WebDriver to acknowledge.
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            match session.quit().await {
                Ok(()) => tracing::debug!("WebDriver closed successfully."),
                Err(e) => tracing::warn!("Error closing WebDriver: {}", e),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        tracing::warn!("Browser session dropped without release, closing in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.quit().await {
                        tracing::warn!("Error closing WebDriver: {}", e);
                    }
                });
            }
            Err(_) => tracing::error!("No async runtime available, browser session leaked"),
        }
    }
}

/// Launches sessions against a WebDriver server (msedgedriver, chromedriver, geckodriver).
pub struct WebDriverLauncher {
    endpoint: String,
    browser_name: String,
}

impl WebDriverLauncher {
    pub fn new(endpoint: String, browser_name: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            browser_name,
        }
    }

    /// `alwaysMatch` capabilities: the browser name plus its headless options.
    fn capabilities(&self) -> Map<String, Value> {
        let (options_key, args) = match self.browser_name.to_ascii_lowercase().as_str() {
            "microsoftedge" | "msedge" | "edge" => (
                "ms:edgeOptions",
                json!(["--headless=new", "--disable-dev-shm-usage", "--disable-gpu"]),
            ),
            "firefox" => ("moz:firefoxOptions", json!(["-headless"])),
            _ => (
                "goog:chromeOptions",
                json!(["--headless=new", "--disable-dev-shm-usage", "--disable-gpu"]),
            ),
        };

        let mut capabilities = Map::new();
        capabilities.insert("browserName".to_string(), json!(self.browser_name));
        capabilities.insert(options_key.to_string(), json!({ "args": args }));
        capabilities
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        let client = builder.connect(&self.endpoint).await?;

        tracing::debug!(browser = %self.browser_name, "WebDriver session started");
        Ok(Box::new(WebDriverSession {
            client: Some(client),
        }))
    }
}

struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    fn client(&self) -> Result<&Client, BrowserError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrowserError::WebDriver("session already closed".to_string()))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.client()?.goto(url).await?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let found = self
            .client()?
            .wait()
            .at_most(timeout)
            .every(POLL_INTERVAL)
            .for_element(Locator::Css(selector))
            .await;

        match found {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(BrowserError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        Ok(self.client()?.source().await?)
    }

    async fn quit(&mut self) -> Result<(), BrowserError> {
        match self.client.take() {
            Some(client) => Ok(client.close().await?),
            None => Ok(()),
        }
    }
}
