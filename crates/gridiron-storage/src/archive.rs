use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{BackendFetchError, FetchOptions, RawPayload, ScrapeBackend};

/// File in each page directory naming the newest copy.
const LATEST: &str = "latest";

/// Which season page a url points at: `/years/{season}/{page}.htm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKey {
    pub season: i32,
    pub page: String,
}

impl PageKey {
    /// `None` for anything outside a season's pages, such as the weather feed.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next()?;
        let mut segments = path.split('/');
        segments.find(|s| *s == "years")?;
        let season = segments.next()?.parse().ok()?;
        Some(Self {
            season,
            page: page_slug(path),
        })
    }

    fn dir(&self) -> PathBuf {
        PathBuf::from(self.season.to_string()).join(&self.page)
    }
}

#[derive(Debug, Clone)]
pub struct ArchivedPage {
    pub key: PageKey,
    pub content_hash: String,
    pub path: PathBuf,
    pub fetched_at: DateTime<Utc>,
    pub deduplicated: bool,
}

/// Season pages as fetched, on local disk.
///
/// Layout is `{season}/{page}/{sha256}.html`, with a `latest` file per page
/// holding the newest hash and its fetch time. Both are written to a temp
/// file and renamed into place so a reader never sees a partial write.
/// Blocking file I/O: the archive is only touched from backend workers.
#[derive(Debug, Clone)]
pub struct PageArchive {
    root: PathBuf,
}

impl PageArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    pub fn store(
        &self,
        key: &PageKey,
        fetched_at: DateTime<Utc>,
        body: &str,
    ) -> anyhow::Result<ArchivedPage> {
        let dir = self.root.join(key.dir());
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating archive directory {}", dir.display()))?;

        let content_hash = Self::sha256_hex(body.as_bytes());
        let path = dir.join(format!("{content_hash}.html"));
        let deduplicated = path.exists();
        if !deduplicated {
            write_atomic(&dir, &path, body.as_bytes())?;
        }
        let pointer = format!("{content_hash}\n{}\n", fetched_at.to_rfc3339());
        write_atomic(&dir, &dir.join(LATEST), pointer.as_bytes())?;

        Ok(ArchivedPage {
            key: key.clone(),
            content_hash,
            path,
            fetched_at,
            deduplicated,
        })
    }

    /// Newest stored copy of a page and its body, or `None` if never archived.
    pub fn latest(&self, key: &PageKey) -> anyhow::Result<Option<(ArchivedPage, String)>> {
        let dir = self.root.join(key.dir());
        let pointer = match fs::read_to_string(dir.join(LATEST)) {
            Ok(pointer) => pointer,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).context("reading latest pointer"),
        };
        let mut lines = pointer.lines();
        let (Some(content_hash), Some(stamp)) = (lines.next(), lines.next()) else {
            anyhow::bail!("malformed latest pointer in {}", dir.display());
        };
        let fetched_at = DateTime::parse_from_rfc3339(stamp)
            .with_context(|| format!("fetch time in {}", dir.display()))?
            .with_timezone(&Utc);
        let path = dir.join(format!("{content_hash}.html"));
        let body = fs::read_to_string(&path)
            .with_context(|| format!("reading archived page {}", path.display()))?;
        let page = ArchivedPage {
            key: key.clone(),
            content_hash: content_hash.to_string(),
            path,
            fetched_at,
            deduplicated: true,
        };
        Ok(Some((page, body)))
    }
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let temp_path = dir.join(format!(".{}.tmp", Uuid::new_v4()));
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .with_context(|| format!("opening temp file {}", temp_path.display()))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;
    drop(file);

    fs::rename(&temp_path, target).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        anyhow::Error::new(err).context(format!(
            "renaming {} -> {}",
            temp_path.display(),
            target.display()
        ))
    })
}

/// Last path segment without its extension, e.g. `passing` for
/// `.../years/2024/passing.htm`.
pub fn page_slug(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let stem = last.split('.').next().unwrap_or(last);
    let slug: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "index".to_string()
    } else {
        slug
    }
}

/// Archives every successfully fetched season page before returning it.
/// Archive failures are logged and never fail the fetch.
pub struct ArchivingBackend {
    inner: Arc<dyn ScrapeBackend>,
    archive: PageArchive,
}

impl ArchivingBackend {
    pub fn new(inner: Arc<dyn ScrapeBackend>, archive: PageArchive) -> Self {
        Self { inner, archive }
    }
}

impl ScrapeBackend for ArchivingBackend {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawPayload, BackendFetchError> {
        let payload = self.inner.fetch(url, options)?;
        match PageKey::from_url(url) {
            Some(key) => {
                if let Err(err) = self.archive.store(&key, payload.fetched_at, &payload.body) {
                    warn!(url, error = %err, "archiving fetched page failed");
                }
            }
            None => debug!(url, "not a season page, not archived"),
        }
        Ok(payload)
    }
}

/// Serves the newest archived copy of each season page; pages never
/// archived are reported as 404s so weekly walks stop where the archive does.
pub struct ArchiveBackend {
    archive: PageArchive,
}

impl ArchiveBackend {
    pub fn new(archive: PageArchive) -> Self {
        Self { archive }
    }
}

impl ScrapeBackend for ArchiveBackend {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn fetch(&self, url: &str, _: &FetchOptions) -> Result<RawPayload, BackendFetchError> {
        let key = PageKey::from_url(url)
            .ok_or_else(|| BackendFetchError::new(url, "not a season page"))?;
        let (page, body) = self
            .archive
            .latest(&key)
            .map_err(|err| BackendFetchError::new(url, format!("{err:#}")))?
            .ok_or_else(|| BackendFetchError::new(url, "http status 404 (not archived)"))?;
        Ok(RawPayload {
            url: url.to_string(),
            final_url: url.to_string(),
            body,
            fetched_at: page.fetched_at,
            backend: self.name(),
        })
    }
}
