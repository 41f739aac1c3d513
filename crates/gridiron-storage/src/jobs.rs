use chrono::{DateTime, Utc};
use gridiron_core::{JobStatus, ScrapeJob, StatResult};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::repository::PersistenceError;
use crate::session::Session;

pub const JOBS_TABLE: &str = "scrape_jobs";

const JOB_COLUMNS: &str =
    "id, season, requested_stats, dry_run, status, started_at, finished_at, results";

/// Persistence for batch job progress rows.
pub struct JobStore<'s> {
    session: &'s mut Session,
}

impl<'s> JobStore<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    /// Writes a new job row and stamps the id onto `job`.
    pub async fn insert(&mut self, job: &mut ScrapeJob, commit: bool) -> Result<i64, PersistenceError> {
        let requested = encode(&job.requested_stats)?;
        let results = encode(&job.results)?;
        let conn = self.session.connection().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO scrape_jobs \
             (season, requested_stats, dry_run, status, started_at, finished_at, results, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(job.season)
        .bind(requested)
        .bind(job.dry_run)
        .bind(job.status.as_str())
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(results)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;
        if commit {
            self.session.commit().await?;
        }
        job.id = Some(id);
        Ok(id)
    }

    /// Overwrites status, timestamps and results of an inserted job.
    pub async fn update(&mut self, job: &ScrapeJob, commit: bool) -> Result<(), PersistenceError> {
        let Some(id) = job.id else {
            return Err(PersistenceError::Unsaved { table: JOBS_TABLE });
        };
        let results = encode(&job.results)?;
        let conn = self.session.connection().await?;
        let done = sqlx::query(
            "UPDATE scrape_jobs SET status = ?, started_at = ?, finished_at = ?, results = ? \
             WHERE id = ?",
        )
        .bind(job.status.as_str())
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(results)
        .bind(id)
        .execute(conn)
        .await?;
        if done.rows_affected() == 0 {
            return Err(PersistenceError::Unmapped {
                table: JOBS_TABLE,
                id,
            });
        }
        if commit {
            self.session.commit().await?;
        }
        Ok(())
    }

    pub async fn get(&mut self, id: i64) -> Result<Option<ScrapeJob>, PersistenceError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM scrape_jobs WHERE id = ?");
        let conn = self.session.connection().await?;
        let row = sqlx::query(&sql).bind(id).fetch_optional(conn).await?;
        row.as_ref().map(decode_job).transpose()
    }

    /// Most recent jobs first, optionally narrowed to one status.
    pub async fn list(
        &mut self,
        status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<ScrapeJob>, PersistenceError> {
        let filter = if status.is_some() { "WHERE status = ?" } else { "" };
        let sql = format!("SELECT {JOB_COLUMNS} FROM scrape_jobs {filter} ORDER BY id DESC LIMIT ?");
        let conn = self.session.connection().await?;
        let mut query = sqlx::query(&sql);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        let rows = query.bind(limit.max(0)).fetch_all(conn).await?;
        rows.iter().map(decode_job).collect()
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|err| PersistenceError::Malformed(err.to_string()))
}

fn decode_job(row: &SqliteRow) -> Result<ScrapeJob, PersistenceError> {
    let requested: String = row.try_get("requested_stats")?;
    let results: String = row.try_get("results")?;
    let status: String = row.try_get("status")?;
    Ok(ScrapeJob {
        id: Some(row.try_get("id")?),
        season: row.try_get("season")?,
        requested_stats: serde_json::from_str::<Vec<String>>(&requested)
            .map_err(|err| PersistenceError::Malformed(format!("requested_stats: {err}")))?,
        dry_run: row.try_get("dry_run")?,
        status: JobStatus::parse(&status)
            .ok_or_else(|| PersistenceError::Malformed(format!("job status {status:?}")))?,
        started_at: row.try_get::<Option<DateTime<Utc>>, _>("started_at")?,
        finished_at: row.try_get::<Option<DateTime<Utc>>, _>("finished_at")?,
        results: serde_json::from_str::<Vec<StatResult>>(&results)
            .map_err(|err| PersistenceError::Malformed(format!("results: {err}")))?,
    })
}
