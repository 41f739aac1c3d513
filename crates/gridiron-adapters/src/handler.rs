use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use gridiron_core::{FieldSource, GridironError, StatEntity, StatId, StatRecord};
use gridiron_storage::{FetchOptions, RawPayload, Repository, ScrapeBackend, Session};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use tracing::debug;

use crate::pfr::{self, PfrRow, TableSelection};
use crate::weather::WeatherFeed;

pub const DEFAULT_BASE_URL: &str = "https://www.pro-football-reference.com";

/// Everything a handler needs to reach the upstream site.
#[derive(Clone)]
pub struct ScrapeContext {
    pub backend: Arc<dyn ScrapeBackend>,
    /// Script-capable backend for pages that only render in a browser.
    pub rendering: Option<Arc<dyn ScrapeBackend>>,
    pub options: FetchOptions,
    pub base_url: String,
    /// Pause between pages of a stat that spans several pages.
    pub page_delay: Duration,
    pub weather: Option<WeatherFeed>,
}

impl ScrapeContext {
    pub fn new(backend: Arc<dyn ScrapeBackend>, options: FetchOptions) -> Self {
        Self {
            backend,
            rendering: None,
            options,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_delay: Duration::ZERO,
            weather: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rendering(mut self, backend: Option<Arc<dyn ScrapeBackend>>) -> Self {
        self.rendering = backend;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_weather(mut self, feed: Option<WeatherFeed>) -> Self {
        self.weather = feed;
        self
    }

    /// The rendering backend when one is configured, else the plain one.
    pub fn rendering_backend(&self) -> &Arc<dyn ScrapeBackend> {
        self.rendering.as_ref().unwrap_or(&self.backend)
    }

    /// `{base}/years/{season}/{page}`; an empty page is the season index.
    pub fn season_url(&self, season: i32, page: &str) -> String {
        format!(
            "{}/years/{season}/{page}",
            self.base_url.trim_end_matches('/')
        )
    }
}

/// Fetch, parse and persist for one stat type.
///
/// `fetch` and `parse` block the calling thread; the orchestrator runs them
/// on the blocking bridge. `persist` writes through the caller's session
/// without committing it.
#[async_trait]
pub trait StatHandler: Send + Sync {
    fn stat(&self) -> StatId;

    /// Record table this handler writes.
    fn table(&self) -> &'static str;

    fn url(&self, ctx: &ScrapeContext, season: i32) -> String;

    fn fetch(&self, ctx: &ScrapeContext, season: i32) -> Result<RawPayload, GridironError> {
        let url = self.url(ctx, season);
        Ok(ctx.backend.fetch(&url, &ctx.options)?)
    }

    fn parse(&self, payload: &RawPayload, season: i32) -> Result<Vec<StatRecord>, GridironError>;

    /// Fetch then parse. Stats spread over several pages or feeds override this.
    fn scrape(&self, ctx: &ScrapeContext, season: i32) -> Result<Vec<StatRecord>, GridironError> {
        let payload = self.fetch(ctx, season)?;
        self.parse(&payload, season)
    }

    /// Upserts every record; returns how many were handed in.
    async fn persist(
        &self,
        session: &mut Session,
        records: Vec<StatRecord>,
    ) -> Result<usize, GridironError>;

    /// Stored rows of one season, optionally one week, as JSON objects with their ids.
    async fn stored(
        &self,
        session: &mut Session,
        season: i32,
        week: Option<i32>,
    ) -> Result<Vec<serde_json::Value>, GridironError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conv {
    Int,
    Real,
    Text,
    /// Text with the `*`/`+` honours markers removed.
    Name,
    Week,
    Date,
}

/// Maps one record field to the PFR `data-stat` cell it is read from.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub data_stat: &'static str,
    pub conv: Conv,
}

pub const fn int(field: &'static str, data_stat: &'static str) -> FieldSpec {
    FieldSpec { field, data_stat, conv: Conv::Int }
}

pub const fn real(field: &'static str, data_stat: &'static str) -> FieldSpec {
    FieldSpec { field, data_stat, conv: Conv::Real }
}

pub const fn text(field: &'static str, data_stat: &'static str) -> FieldSpec {
    FieldSpec { field, data_stat, conv: Conv::Text }
}

pub const fn name(field: &'static str, data_stat: &'static str) -> FieldSpec {
    FieldSpec { field, data_stat, conv: Conv::Name }
}

pub const fn week(field: &'static str, data_stat: &'static str) -> FieldSpec {
    FieldSpec { field, data_stat, conv: Conv::Week }
}

pub const fn date(field: &'static str, data_stat: &'static str) -> FieldSpec {
    FieldSpec { field, data_stat, conv: Conv::Date }
}

/// Newer PFR pages renamed a few identity columns.
const CELL_ALIASES: &[(&str, &str)] = &[("team", "team_name_abbr"), ("player", "name_display")];

/// League and multi-team summary lines that are not a single team's row.
const AGGREGATE_TEAMS: &[&str] = &[
    "Avg Team",
    "Avg Tm",
    "League Total",
    "Tm",
    "2TM",
    "3TM",
    "4TM",
    "5TM",
];

fn cell<'r>(row: &'r PfrRow, data_stat: &str) -> Option<&'r str> {
    row.get(data_stat)
        .or_else(|| {
            CELL_ALIASES
                .iter()
                .find(|(primary, _)| *primary == data_stat)
                .and_then(|(_, alias)| row.get(*alias))
        })
        .map(String::as_str)
}

/// Typed view of one PFR row through a field map.
struct RowSource<'a> {
    season: i32,
    row: &'a PfrRow,
    fields: &'a [&'a [FieldSpec]],
}

impl RowSource<'_> {
    fn spec(&self, field: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .flat_map(|group| group.iter())
            .find(|spec| spec.field == field)
    }

    fn raw(&self, field: &str) -> Option<(&str, Conv)> {
        let spec = self.spec(field)?;
        Some((cell(self.row, spec.data_stat)?, spec.conv))
    }
}

impl FieldSource for RowSource<'_> {
    fn season(&self) -> i32 {
        self.season
    }

    fn int(&self, field: &str) -> Option<i64> {
        match self.raw(field)? {
            (raw, Conv::Week) => pfr::parse_week(raw),
            (raw, _) => pfr::to_int(raw),
        }
    }

    fn real(&self, field: &str) -> Option<f64> {
        let (raw, _) = self.raw(field)?;
        pfr::to_decimal(raw)
    }

    fn text(&self, field: &str) -> Option<String> {
        match self.raw(field)? {
            (raw, Conv::Name) => pfr::clean_name(raw),
            (raw, Conv::Date) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .map(|d| d.format("%Y-%m-%d").to_string()),
            (raw, _) => pfr::clean_text(raw),
        }
    }
}

/// Where a stat lives on PFR and how its cells map onto the record.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Page under `/years/{season}/`; empty for the season index.
    pub page: &'static str,
    pub tables: TableSelection,
    pub fields: &'static [&'static [FieldSpec]],
    /// Text fields that must be present for a row to count, beyond the key.
    pub required: &'static [&'static str],
}

/// Upserts `records` through the session without committing.
pub(crate) async fn upsert_records<T>(
    session: &mut Session,
    records: Vec<StatRecord>,
) -> Result<usize, GridironError>
where
    T: StatEntity + for<'r> FromRow<'r, SqliteRow>,
{
    let mut repo = Repository::<T>::new(session);
    let mut written = 0;
    for record in records {
        repo.upsert(T::try_from(record)?, false).await?;
        written += 1;
    }
    Ok(written)
}

pub(crate) async fn stored_rows<T>(
    session: &mut Session,
    season: i32,
    week: Option<i32>,
) -> Result<Vec<serde_json::Value>, GridironError>
where
    T: StatEntity + Serialize + for<'r> FromRow<'r, SqliteRow>,
{
    let rows = Repository::<T>::new(session)
        .find_by_season(season, week)
        .await?;
    rows.iter()
        .map(|row| serde_json::to_value(row).map_err(|err| GridironError::Persistence(err.to_string())))
        .collect()
}

/// Handler for any stat that is one PFR table mapped onto one record type.
pub struct TableHandler<T> {
    pub(crate) stat: StatId,
    pub(crate) spec: TableSpec,
    _record: PhantomData<fn() -> T>,
}

impl<T> TableHandler<T> {
    pub fn new(stat: StatId, spec: TableSpec) -> Self {
        Self {
            stat,
            spec,
            _record: PhantomData,
        }
    }
}

impl<T: StatEntity> TableHandler<T> {
    /// Records from already-extracted rows, dropping aggregate and keyless lines.
    pub fn records_from_rows(&self, rows: &[PfrRow], season: i32) -> Vec<T> {
        rows.iter()
            .filter_map(|row| {
                let src = RowSource {
                    season,
                    row,
                    fields: self.spec.fields,
                };
                let team = src.text("team")?;
                if AGGREGATE_TEAMS.contains(&team.as_str()) {
                    return None;
                }
                if self.spec.required.iter().any(|f| src.text(f).is_none()) {
                    return None;
                }
                T::from_source(&src)
            })
            .collect()
    }
}

#[async_trait]
impl<T> StatHandler for TableHandler<T>
where
    T: StatEntity + Serialize + for<'r> FromRow<'r, SqliteRow>,
{
    fn stat(&self) -> StatId {
        self.stat
    }

    fn table(&self) -> &'static str {
        T::TABLE
    }

    fn url(&self, ctx: &ScrapeContext, season: i32) -> String {
        ctx.season_url(season, self.spec.page)
    }

    fn parse(&self, payload: &RawPayload, season: i32) -> Result<Vec<StatRecord>, GridironError> {
        let rows = pfr::extract_rows(&payload.body, self.spec.tables)
            .map_err(|cause| GridironError::BackendFetch(format!("{}: {cause}", payload.url)))?;
        let records = self.records_from_rows(&rows, season);
        debug!(
            stat = %self.stat,
            rows = rows.len(),
            records = records.len(),
            "parsed stat page"
        );
        if records.is_empty() {
            return Err(GridironError::BackendFetch(format!(
                "{}: empty payload",
                payload.url
            )));
        }
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// The count is of parsed records, not distinct rows: duplicate natural
    /// keys on one page are each counted though the later ones overwrite.
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
    use gridiron_core::{Games, Passing, Standings};

    fn row(cells: &[(&str, &str)]) -> PfrRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const STANDINGS_FIELDS: &[FieldSpec] = &[
        name("team", "team"),
        int("wins", "wins"),
        real("win_pct", "win_loss_perc"),
    ];

    #[test]
    fn aggregate_and_keyless_rows_are_dropped() {
        let handler = TableHandler::<Standings>::new(
            StatId::Standings,
            TableSpec {
                page: "",
                tables: TableSelection::AllOf(&["AFC", "NFC"]),
                fields: &[STANDINGS_FIELDS],
                required: &[],
            },
        );
        let rows = vec![
            row(&[("team", "Kansas City Chiefs*"), ("wins", "15"), ("win_loss_perc", ".882")]),
            row(&[("team", "Avg Team"), ("wins", "8")]),
            row(&[("team", ""), ("wins", "3")]),
        ];
        let records = handler.records_from_rows(&rows, 2024);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].team, "Kansas City Chiefs");
        assert_eq!(records[0].wins, Some(15));
        assert_eq!(records[0].win_pct, Some(0.882));
        assert_eq!(records[0].losses, None);
    }

    #[test]
    fn renamed_identity_columns_are_read_through_aliases() {
        const FIELDS: &[FieldSpec] = &[name("team", "team"), name("player", "player"), int("yards", "pass_yds")];
        let handler = TableHandler::<Passing>::new(
            StatId::Passing,
            TableSpec {
                page: "passing.htm",
                tables: TableSelection::FirstOf(&["passing"]),
                fields: &[FIELDS],
                required: &[],
            },
        );
        let rows = vec![row(&[
            ("name_display", "Joe Burrow*"),
            ("team_name_abbr", "CIN"),
            ("pass_yds", "4,918"),
        ])];
        let records = handler.records_from_rows(&rows, 2024);
        assert_eq!(records[0].player, "Joe Burrow");
        assert_eq!(records[0].team, "CIN");
        assert_eq!(records[0].yards, Some(4918));
    }

    #[test]
    fn required_fields_and_week_keys_gate_game_rows() {
        const FIELDS: &[FieldSpec] = &[
            week("week", "week_num"),
            name("team", "winner"),
            name("opponent", "loser"),
            date("game_date", "game_date"),
        ];
        let handler = TableHandler::<Games>::new(
            StatId::Games,
            TableSpec {
                page: "games.htm",
                tables: TableSelection::FirstOf(&["games"]),
                fields: &[FIELDS],
                required: &["opponent"],
            },
        );
        let rows = vec![
            row(&[("week_num", "1"), ("winner", "Kansas City Chiefs"), ("loser", "Baltimore Ravens"), ("game_date", "2024-09-05")]),
            row(&[("week_num", "SuperBowl"), ("winner", "Philadelphia Eagles"), ("loser", "Kansas City Chiefs"), ("game_date", "bad")]),
            row(&[("week_num", "18"), ("winner", "Buffalo Bills"), ("loser", "")]),
        ];
        let games = handler.records_from_rows(&rows, 2024);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].week, 1);
        assert_eq!(games[0].game_date.as_deref(), Some("2024-09-05"));
        assert_eq!(games[1].week, 22);
        assert_eq!(games[1].game_date, None);
    }
}
