use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use gridiron_core::GridironError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;
use tracing::{info_span, warn};

use crate::archive::{ArchiveBackend, ArchivingBackend, PageArchive};

/// Raw page handed back by a backend, before any parsing.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub url: String,
    pub final_url: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
    pub backend: &'static str,
}

#[derive(Debug, Error)]
#[error("{url}: {cause}")]
pub struct BackendFetchError {
    pub url: String,
    pub cause: String,
}

impl BackendFetchError {
    pub fn new(url: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            url: url.into(),
            cause: cause.to_string(),
        }
    }
}

impl From<BackendFetchError> for GridironError {
    fn from(err: BackendFetchError) -> Self {
        GridironError::BackendFetch(err.to_string())
    }
}

/// Browser profile a backend presents to the upstream site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Impersonate {
    #[default]
    Chrome,
    Firefox,
    Safari,
    None,
}

impl Impersonate {
    pub fn as_str(self) -> &'static str {
        match self {
            Impersonate::Chrome => "chrome",
            Impersonate::Firefox => "firefox",
            Impersonate::Safari => "safari",
            Impersonate::None => "none",
        }
    }

    pub fn user_agent(self) -> Option<&'static str> {
        match self {
            Impersonate::Chrome => Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            ),
            Impersonate::Firefox => Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
            ),
            Impersonate::Safari => Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
            ),
            Impersonate::None => None,
        }
    }

    fn headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(agent) = self.user_agent() {
            headers.insert(USER_AGENT, HeaderValue::from_static(agent));
            headers.insert(
                ACCEPT,
                HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
            );
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        }
        headers
    }
}

impl FromStr for Impersonate {
    type Err = GridironError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" => Ok(Impersonate::Chrome),
            "firefox" => Ok(Impersonate::Firefox),
            "safari" => Ok(Impersonate::Safari),
            "none" | "" => Ok(Impersonate::None),
            other => Err(GridironError::Validation(format!(
                "unknown impersonation profile {other:?}"
            ))),
        }
    }
}

/// Per-call knobs forwarded unchanged to the backend.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub impersonate: Impersonate,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            impersonate: Impersonate::Chrome,
        }
    }
}

/// Fetches one page. Implementations block the calling thread, so callers
/// on the async side go through the blocking bridge.
pub trait ScrapeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawPayload, BackendFetchError>;
}

/// Plain HTTP backend built on reqwest's blocking client.
///
/// The client is built on the first fetch, which runs on a bridge worker,
/// and reused for every later page. Timeout and browser headers are applied
/// per request since they come with each call's options.
#[derive(Debug, Default)]
pub struct HttpBackend {
    client: OnceLock<Result<reqwest::blocking::Client, String>>,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, url: &str) -> Result<&reqwest::blocking::Client, BackendFetchError> {
        self.client
            .get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .gzip(true)
                    .brotli(true)
                    .build()
                    .map_err(|err| err.to_string())
            })
            .as_ref()
            .map_err(|err| BackendFetchError::new(url, format!("building client: {err}")))
    }
}

impl ScrapeBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawPayload, BackendFetchError> {
        let span = info_span!("http_fetch", url, impersonate = options.impersonate.as_str());
        let _guard = span.enter();

        let resp = self
            .client(url)?
            .get(url)
            .timeout(options.timeout)
            .headers(options.impersonate.headers())
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    BackendFetchError::new(url, format!("timed out after {:?}", options.timeout))
                } else {
                    BackendFetchError::new(url, err)
                }
            })?;

        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(BackendFetchError::new(url, format!("http status {}", status.as_u16())));
        }

        let body = resp
            .text()
            .map_err(|err| BackendFetchError::new(url, format!("reading body: {err}")))?;
        if body.trim().is_empty() {
            return Err(BackendFetchError::new(url, "empty payload"));
        }

        Ok(RawPayload {
            url: url.to_string(),
            final_url,
            body,
            fetched_at: Utc::now(),
            backend: self.name(),
        })
    }
}

/// Runs `work` against an open page and then closes it, whatever `work`
/// returned. A failed close is logged and never replaces the fetch result.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn close_after<R, T, C: fmt::Display>(
    url: &str,
    page: R,
    work: impl FnOnce(&R) -> Result<T, BackendFetchError>,
    close: impl FnOnce(R) -> Result<(), C>,
) -> Result<T, BackendFetchError> {
    let result = work(&page);
    if let Err(err) = close(page) {
        warn!(url, error = %err, "closing browser tab failed");
    }
    result
}

#[cfg(feature = "browser")]
pub use browser::BrowserBackend;

#[cfg(feature = "browser")]
mod browser {
    use std::sync::Mutex;

    use chrono::Utc;
    use headless_chrome::{Browser, LaunchOptions, Tab};
    use tracing::info_span;

    use super::{close_after, BackendFetchError, FetchOptions, RawPayload, ScrapeBackend};

    /// Headless Chrome backend for pages that need script execution.
    /// One browser process is launched on first use and shared by later fetches.
    #[derive(Default)]
    pub struct BrowserBackend {
        browser: Mutex<Option<Browser>>,
    }

    impl BrowserBackend {
        pub fn new() -> Self {
            Self::default()
        }

        fn launch(url: &str) -> Result<Browser, BackendFetchError> {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .build()
                .map_err(|err| BackendFetchError::new(url, format!("browser options: {err}")))?;
            Browser::new(options)
                .map_err(|err| BackendFetchError::new(url, format!("launching browser: {err}")))
        }
    }

    /// DOM and final url of one page, read from an already open tab.
    fn render(
        tab: &Tab,
        url: &str,
        options: &FetchOptions,
    ) -> Result<(String, String), BackendFetchError> {
        tab.set_default_timeout(options.timeout);
        if let Some(agent) = options.impersonate.user_agent() {
            tab.set_user_agent(agent, Some("en-US,en;q=0.9"), None)
                .map_err(|err| BackendFetchError::new(url, format!("user agent: {err}")))?;
        }
        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|err| BackendFetchError::new(url, format!("navigating: {err}")))?;
        let body = tab
            .get_content()
            .map_err(|err| BackendFetchError::new(url, format!("reading DOM: {err}")))?;
        Ok((body, tab.get_url()))
    }

    impl ScrapeBackend for BrowserBackend {
        fn name(&self) -> &'static str {
            "browser"
        }

        fn fetch(
            &self,
            url: &str,
            options: &FetchOptions,
        ) -> Result<RawPayload, BackendFetchError> {
            let span = info_span!("browser_fetch", url);
            let _guard = span.enter();

            let mut guard = self
                .browser
                .lock()
                .map_err(|_| BackendFetchError::new(url, "browser handle poisoned"))?;
            if guard.is_none() {
                *guard = Some(Self::launch(url)?);
            }
            let Some(browser) = guard.as_ref() else {
                return Err(BackendFetchError::new(url, "browser not running"));
            };

            let tab = browser
                .new_tab()
                .map_err(|err| BackendFetchError::new(url, format!("opening tab: {err}")))?;
            let (body, final_url) = close_after(
                url,
                tab,
                |tab| render(tab, url, options),
                |tab| tab.close(true).map(|_| ()),
            )?;

            if body.trim().is_empty() {
                return Err(BackendFetchError::new(url, "empty payload"));
            }
            Ok(RawPayload {
                url: url.to_string(),
                final_url,
                body,
                fetched_at: Utc::now(),
                backend: self.name(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Browser,
    /// Replays pages from the archive instead of going upstream.
    Archive,
}

impl FromStr for BackendKind {
    type Err = GridironError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(BackendKind::Http),
            "browser" => Ok(BackendKind::Browser),
            "archive" => Ok(BackendKind::Archive),
            other => Err(GridironError::Validation(format!(
                "unknown SCRAPE_BACKEND {other:?} (expected http, browser or archive)"
            ))),
        }
    }
}

fn archived(inner: Arc<dyn ScrapeBackend>, archive: Option<PageArchive>) -> Arc<dyn ScrapeBackend> {
    match archive {
        Some(archive) => Arc::new(ArchivingBackend::new(inner, archive)),
        None => inner,
    }
}

/// Builds the configured backend. Live backends are wrapped in the page
/// archive when one is set; the archive kind replays from it instead.
pub fn build_backend(
    kind: BackendKind,
    archive: Option<PageArchive>,
) -> Result<Arc<dyn ScrapeBackend>, GridironError> {
    let inner: Arc<dyn ScrapeBackend> = match kind {
        BackendKind::Http => Arc::new(HttpBackend::new()),
        #[cfg(feature = "browser")]
        BackendKind::Browser => Arc::new(BrowserBackend::new()),
        #[cfg(not(feature = "browser"))]
        BackendKind::Browser => {
            return Err(GridironError::Validation(
                "SCRAPE_BACKEND=browser requires the `browser` feature".to_string(),
            ))
        }
        BackendKind::Archive => {
            return match archive {
                Some(archive) => Ok(Arc::new(ArchiveBackend::new(archive))),
                None => Err(GridironError::Validation(
                    "SCRAPE_BACKEND=archive requires ARTIFACTS_DIR".to_string(),
                )),
            }
        }
    };
    Ok(archived(inner, archive))
}

/// Backend for pages that only fill in after script execution.
///
/// `None` means the main backend serves those pages too: it already
/// renders, it replays from the archive, or the `browser` feature is off.
pub fn build_rendering_backend(
    kind: BackendKind,
    archive: Option<PageArchive>,
) -> Option<Arc<dyn ScrapeBackend>> {
    match kind {
        BackendKind::Browser | BackendKind::Archive => None,
        #[cfg(feature = "browser")]
        BackendKind::Http => Some(archived(Arc::new(BrowserBackend::new()), archive)),
        #[cfg(not(feature = "browser"))]
        BackendKind::Http => {
            drop(archive);
            None
        }
    }
}
