use std::sync::Arc;

use async_trait::async_trait;
use gridiron_core::{GridironError, StatEntity, StatId, StatRecord};
use gridiron_storage::{RawPayload, ScrapeBackend, Session};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use tracing::debug;

use crate::handler::{stored_rows, upsert_records, ScrapeContext, StatHandler, TableHandler, TableSpec};
use crate::pfr;

/// Regular-season weeks tried for week-paged stats.
pub const REGULAR_SEASON_WEEKS: i32 = 18;

/// Cells written into every row before field mapping.
const WEEK_CELL: &str = "week_num";
const REPORT_DATE_CELL: &str = "report_date";

/// Week number of a `.../week_{n}_{page}` url.
pub fn week_from_url(url: &str) -> Option<i32> {
    let page = url.split(['?', '#']).next()?.rsplit('/').next()?;
    let (week, _) = page.strip_prefix("week_")?.split_once('_')?;
    week.parse().ok()
}

/// A stat PFR publishes one page per week, `/years/{season}/week_{n}_{page}`.
///
/// Weeks are fetched from 1 upwards until a page is missing; the week and
/// the fetch date are stamped onto each row before the table's field map runs.
pub struct WeeklyTableHandler<T> {
    inner: TableHandler<T>,
    rendered: bool,
}

impl<T> WeeklyTableHandler<T> {
    pub fn new(stat: StatId, spec: TableSpec) -> Self {
        Self {
            inner: TableHandler::new(stat, spec),
            rendered: false,
        }
    }

    /// Fetch through the context's rendering backend.
    pub fn rendered(mut self) -> Self {
        self.rendered = true;
        self
    }

    fn backend<'c>(&self, ctx: &'c ScrapeContext) -> &'c Arc<dyn ScrapeBackend> {
        if self.rendered {
            ctx.rendering_backend()
        } else {
            &ctx.backend
        }
    }

    pub fn week_url(&self, ctx: &ScrapeContext, season: i32, week: i32) -> String {
        ctx.season_url(season, &format!("week_{week}_{}", self.inner.spec.page))
    }
}

impl<T: StatEntity> WeeklyTableHandler<T> {
    fn week_records(&self, payload: &RawPayload, season: i32) -> Result<Vec<T>, GridironError> {
        let week = week_from_url(&payload.url).ok_or_else(|| {
            GridironError::BackendFetch(format!("{}: not a weekly page", payload.url))
        })?;
        let mut rows = pfr::extract_rows(&payload.body, self.inner.spec.tables)
            .map_err(|cause| GridironError::BackendFetch(format!("{}: {cause}", payload.url)))?;
        let report_date = payload.fetched_at.date_naive().format("%Y-%m-%d").to_string();
        for row in &mut rows {
            row.insert(WEEK_CELL.to_string(), week.to_string());
            row.entry(REPORT_DATE_CELL.to_string())
                .or_insert_with(|| report_date.clone());
        }
        Ok(self.inner.records_from_rows(&rows, season))
    }
}

#[async_trait]
impl<T> StatHandler for WeeklyTableHandler<T>
where
    T: StatEntity + Serialize + for<'r> FromRow<'r, SqliteRow>,
{
    fn stat(&self) -> StatId {
        self.inner.stat
    }

    fn table(&self) -> &'static str {
        T::TABLE
    }

    /// First week's page.
    fn url(&self, ctx: &ScrapeContext, season: i32) -> String {
        self.week_url(ctx, season, 1)
    }

    fn fetch(&self, ctx: &ScrapeContext, season: i32) -> Result<RawPayload, GridironError> {
        Ok(self.backend(ctx).fetch(&self.url(ctx, season), &ctx.options)?)
    }

    /// One week's page; the week is read from the payload url.
    fn parse(&self, payload: &RawPayload, season: i32) -> Result<Vec<StatRecord>, GridironError> {
        Ok(self
            .week_records(payload, season)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    fn scrape(&self, ctx: &ScrapeContext, season: i32) -> Result<Vec<StatRecord>, GridironError> {
        let backend = self.backend(ctx);
        let mut records = Vec::new();
        for week in 1..=REGULAR_SEASON_WEEKS {
            if week > 1 && !ctx.page_delay.is_zero() {
                std::thread::sleep(ctx.page_delay);
            }
            let url = self.week_url(ctx, season, week);
            let payload = match backend.fetch(&url, &ctx.options) {
                Ok(payload) => payload,
                Err(err) if week > 1 => {
                    debug!(stat = %self.stat(), week, error = %err, "no page for week, stopping");
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            records.extend(self.parse(&payload, season)?);
        }
        if records.is_empty() {
            return Err(GridironError::BackendFetch(format!(
                "{}: empty payload",
                self.url(ctx, season)
            )));
        }
        Ok(records)
    }

    async fn persist(
        &self,
        session: &mut Session,
        records: Vec<StatRecord>,
    ) -> Result<usize, GridironError> {
        upsert_records::<T>(session, records).await
    }

    async fn stored(
        &self,
        session: &mut Session,
        season: i32,
        week: Option<i32>,
    ) -> Result<Vec<serde_json::Value>, GridironError> {
        stored_rows::<T>(session, season, week).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_numbers_come_from_the_page_name() {
        assert_eq!(
            week_from_url("https://www.pro-football-reference.com/years/2024/week_7_injuries.htm"),
            Some(7)
        );
        assert_eq!(week_from_url("https://host.test/years/2024/week_12_injuries.htm?x=1"), Some(12));
        assert_eq!(week_from_url("https://host.test/years/2024/injuries.htm"), None);
        assert_eq!(week_from_url("https://host.test/years/2024/week_x_injuries.htm"), None);
    }
}
