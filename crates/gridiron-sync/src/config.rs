use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gridiron_adapters::{ScrapeContext, WeatherFeed, DEFAULT_BASE_URL};
use gridiron_core::GridironError;
use gridiron_storage::{
    build_backend, build_rendering_backend, BackendKind, FetchOptions, Impersonate, PageArchive,
    ScrapeBackend,
};

/// Scrape runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub database_url: String,
    pub backend: BackendKind,
    pub request_timeout_secs: u64,
    pub impersonate: Impersonate,
    pub workers: usize,
    pub delay_secs: u64,
    pub base_url: String,
    pub artifacts_dir: Option<PathBuf>,
    /// Set only when `OPENWEATHER_API_KEY` is; weather rows then carry conditions.
    pub weather: Option<WeatherFeed>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://gridiron.db?mode=rwc".to_string(),
            backend: BackendKind::Http,
            request_timeout_secs: 30,
            impersonate: Impersonate::Chrome,
            workers: 4,
            delay_secs: 3,
            base_url: DEFAULT_BASE_URL.to_string(),
            artifacts_dir: None,
            weather: None,
        }
    }
}

impl ScrapeConfig {
    pub fn from_env() -> Result<Self, GridironError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unknown backend or
    /// impersonation names are rejected, malformed numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GridironError> {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            backend: match lookup("SCRAPE_BACKEND") {
                Some(v) => v.parse()?,
                None => defaults.backend,
            },
            request_timeout_secs: lookup("SCRAPE_REQUEST_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            impersonate: match lookup("SCRAPE_IMPERSONATE") {
                Some(v) => v.parse()?,
                None => defaults.impersonate,
            },
            workers: lookup("SCRAPE_WORKERS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.workers)
                .max(1),
            delay_secs: lookup("SCRAPE_DELAY_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.delay_secs),
            base_url: lookup("PFR_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.base_url),
            artifacts_dir: lookup("ARTIFACTS_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            weather: lookup("OPENWEATHER_API_KEY")
                .filter(|v| !v.trim().is_empty())
                .map(|key| {
                    let feed = WeatherFeed::new(key);
                    match lookup("OPENWEATHER_BASE_URL").filter(|v| !v.trim().is_empty()) {
                        Some(base) => feed.with_base_url(base),
                        None => feed,
                    }
                }),
        })
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.request_timeout_secs),
            impersonate: self.impersonate,
        }
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    fn archive(&self) -> Option<PageArchive> {
        self.artifacts_dir.clone().map(PageArchive::new)
    }

    /// The process-wide backend, selected once from `backend`.
    pub fn build_backend(&self) -> Result<Arc<dyn ScrapeBackend>, GridironError> {
        build_backend(self.backend, self.archive())
    }

    pub fn scrape_context(&self) -> Result<ScrapeContext, GridironError> {
        Ok(ScrapeContext::new(self.build_backend()?, self.fetch_options())
            .with_base_url(self.base_url.clone())
            .with_rendering(build_rendering_backend(self.backend, self.archive()))
            .with_page_delay(self.item_delay())
            .with_weather(self.weather.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ScrapeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, BackendKind::Http);
        assert_eq!(config.impersonate, Impersonate::Chrome);
        assert_eq!(config.workers, 4);
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(30));
        assert_eq!(config.item_delay(), Duration::from_secs(3));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.artifacts_dir.is_none());
        assert!(config.weather.is_none());
    }

    #[test]
    fn overrides_are_read_and_workers_never_drop_to_zero() {
        let config = ScrapeConfig::from_lookup(lookup(&[
            ("SCRAPE_IMPERSONATE", "firefox"),
            ("SCRAPE_WORKERS", "0"),
            ("SCRAPE_REQUEST_TIMEOUT", "not-a-number"),
            ("SCRAPE_DELAY_SECONDS", "0"),
            ("ARTIFACTS_DIR", "/tmp/pages"),
        ]))
        .unwrap();
        assert_eq!(config.impersonate, Impersonate::Firefox);
        assert_eq!(config.workers, 1);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.item_delay(), Duration::ZERO);
        assert_eq!(config.artifacts_dir, Some(PathBuf::from("/tmp/pages")));
    }

    #[test]
    fn unknown_backend_or_profile_is_a_validation_error() {
        let err = ScrapeConfig::from_lookup(lookup(&[("SCRAPE_BACKEND", "carrier-pigeon")]))
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let err = ScrapeConfig::from_lookup(lookup(&[("SCRAPE_IMPERSONATE", "netscape")]))
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn weather_feed_follows_the_api_key() {
        let config = ScrapeConfig::from_lookup(lookup(&[
            ("OPENWEATHER_API_KEY", "k3y"),
            ("OPENWEATHER_BASE_URL", "https://weather.test"),
        ]))
        .unwrap();
        let feed = config.weather.as_ref().unwrap();
        assert_eq!(feed.base_url, "https://weather.test");
        assert!(!format!("{config:?}").contains("k3y"));

        let blank = ScrapeConfig::from_lookup(lookup(&[("OPENWEATHER_API_KEY", " ")])).unwrap();
        assert!(blank.weather.is_none());
    }

    #[test]
    fn context_carries_delay_and_weather() {
        let config = ScrapeConfig::from_lookup(lookup(&[
            ("SCRAPE_DELAY_SECONDS", "2"),
            ("OPENWEATHER_API_KEY", "k3y"),
        ]))
        .unwrap();
        let ctx = config.scrape_context().unwrap();
        assert_eq!(ctx.page_delay, Duration::from_secs(2));
        assert!(ctx.weather.is_some());
        assert_eq!(ctx.backend.name(), "http");
    }

    #[test]
    fn archive_backend_replays_from_the_artifacts_dir() {
        let err = ScrapeConfig::from_lookup(lookup(&[("SCRAPE_BACKEND", "archive")]))
            .unwrap()
            .build_backend()
            .err()
            .unwrap();
        assert_eq!(err.kind(), "validation_error");

        let ctx = ScrapeConfig::from_lookup(lookup(&[
            ("SCRAPE_BACKEND", "archive"),
            ("ARTIFACTS_DIR", "/tmp/pages"),
        ]))
        .unwrap()
        .scrape_context()
        .unwrap();
        assert_eq!(ctx.backend.name(), "archive");
        assert!(ctx.rendering.is_none());
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn browser_backend_needs_the_feature() {
        let config =
            ScrapeConfig::from_lookup(lookup(&[("SCRAPE_BACKEND", "browser")])).unwrap();
        let err = config.build_backend().err().unwrap();
        assert_eq!(err.kind(), "validation_error");
    }
}
