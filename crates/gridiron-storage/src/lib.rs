//! SQLite persistence, schema ledger, and page fetch backends for Gridiron.

mod archive;
mod backend;
mod jobs;
mod ledger;
mod repository;
mod session;

pub use archive::{page_slug, ArchiveBackend, ArchivedPage, ArchivingBackend, PageArchive, PageKey};
#[cfg(feature = "browser")]
pub use backend::BrowserBackend;
pub use backend::{
    build_backend, build_rendering_backend, BackendFetchError, BackendKind, FetchOptions, HttpBackend, Impersonate,
    RawPayload, ScrapeBackend,
};
pub use jobs::{JobStore, JOBS_TABLE};
pub use ledger::{MigrationError, MigrationLedger, Revision, UpgradeReport, BASELINE_REVISIONS};
pub use repository::{PersistenceError, Repository, Stored};
pub use session::{Session, SessionFactory};

pub const CRATE_NAME: &str = "gridiron-storage";

/// Opens the store and brings it to the ledger head. Used by the CLI
/// and by tests that need a ready database.
pub async fn open_migrated(database_url: &str) -> anyhow::Result<SessionFactory> {
    use anyhow::Context;

    let factory = SessionFactory::connect(database_url)
        .await
        .with_context(|| format!("connecting to {database_url}"))?;
    let ledger = MigrationLedger::baseline().context("loading schema ledger")?;
    ledger
        .ensure_declared(gridiron_core::RECORD_TABLES.into_iter().chain([JOBS_TABLE]))
        .context("checking record tables against the ledger")?;
    ledger
        .upgrade_to_head(factory.pool())
        .await
        .context("applying schema revisions")?;
    Ok(factory)
}
