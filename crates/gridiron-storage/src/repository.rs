use std::marker::PhantomData;

use gridiron_core::{GameWeather, GridironError, InjuryReport, SqlValue, StatEntity};
use serde::Serialize;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Row, Sqlite};
use thiserror::Error;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("constraint violation on {table}: {message}")]
    ConstraintViolation { table: &'static str, message: String },
    #[error("{table} row {id} is not mapped to a stored row")]
    Unmapped { table: &'static str, id: i64 },
    #[error("{table} record has not been written yet")]
    Unsaved { table: &'static str },
    #[error("{table} cannot be filtered by {column}")]
    InvalidFilter {
        table: &'static str,
        column: &'static str,
    },
    #[error("stored row is malformed: {0}")]
    Malformed(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<PersistenceError> for GridironError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::InvalidFilter { .. } => GridironError::Validation(err.to_string()),
            other => GridironError::Persistence(other.to_string()),
        }
    }
}

fn classify(table: &'static str, err: sqlx::Error) -> PersistenceError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() {
            return PersistenceError::ConstraintViolation {
                table,
                message: db.message().to_string(),
            };
        }
    }
    PersistenceError::Storage(err)
}

/// A record that has been written. Only the repository builds these, so
/// holding one means the row exists (or existed) under `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    id: i64,
    #[serde(flatten)]
    record: T,
}

impl<T> Stored<T> {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    /// Edits stay in memory until handed to [`Repository::update`].
    pub fn record_mut(&mut self) -> &mut T {
        &mut self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_values(mut query: SqliteQuery<'_>, values: Vec<SqlValue>) -> SqliteQuery<'_> {
    for value in values {
        query = match value {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Real(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
        };
    }
    query
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Generic CRUD over one stat table. Writes take a `commit` flag: `true`
/// commits the session right away, `false` leaves the write pending in the
/// session's open transaction.
pub struct Repository<'s, T> {
    session: &'s mut Session,
    _record: PhantomData<fn() -> T>,
}

impl<'s, T> Repository<'s, T>
where
    T: StatEntity + for<'r> FromRow<'r, SqliteRow>,
{
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            _record: PhantomData,
        }
    }

    fn select_sql(filter: &str) -> String {
        format!(
            "SELECT id, {} FROM {} {filter}",
            T::COLUMNS.join(", "),
            T::TABLE
        )
    }

    async fn select_where(
        &mut self,
        filter: &str,
        values: Vec<SqlValue>,
    ) -> Result<Vec<Stored<T>>, PersistenceError> {
        let sql = Self::select_sql(filter);
        let conn = self.session.connection().await?;
        let rows = bind_values(sqlx::query(&sql), values).fetch_all(conn).await?;
        rows.iter().map(Self::decode).collect()
    }

    fn decode(row: &SqliteRow) -> Result<Stored<T>, PersistenceError> {
        Ok(Stored {
            id: row.try_get("id")?,
            record: T::from_row(row)?,
        })
    }

    async fn finish(&mut self, commit: bool) -> Result<(), PersistenceError> {
        if commit {
            self.session.commit().await?;
        }
        Ok(())
    }

    /// Inserts a new row; a clash on the natural key is a constraint violation.
    pub async fn create(&mut self, record: T, commit: bool) -> Result<Stored<T>, PersistenceError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            T::TABLE,
            T::COLUMNS.join(", "),
            placeholders(T::COLUMNS.len())
        );
        let conn = self.session.connection().await?;
        let row = bind_values(sqlx::query(&sql), record.values())
            .fetch_one(conn)
            .await
            .map_err(|err| classify(T::TABLE, err))?;
        let id = row.try_get(0)?;
        self.finish(commit).await?;
        Ok(Stored { id, record })
    }

    /// Inserts, or overwrites every non-key column of the row sharing the
    /// record's natural key.
    pub async fn upsert(&mut self, record: T, commit: bool) -> Result<Stored<T>, PersistenceError> {
        let updates = T::COLUMNS
            .iter()
            .filter(|c| !T::NATURAL_KEY.contains(*c))
            .map(|c| format!("{c} = excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} ({cols}) VALUES ({params}) \
             ON CONFLICT ({keys}) DO UPDATE SET {updates} RETURNING id",
            table = T::TABLE,
            cols = T::COLUMNS.join(", "),
            params = placeholders(T::COLUMNS.len()),
            keys = T::NATURAL_KEY.join(", "),
        );
        let conn = self.session.connection().await?;
        let row = bind_values(sqlx::query(&sql), record.values())
            .fetch_one(conn)
            .await
            .map_err(|err| classify(T::TABLE, err))?;
        let id = row.try_get(0)?;
        self.finish(commit).await?;
        Ok(Stored { id, record })
    }

    /// Writes every column of `stored` back to its row. The natural key may
    /// change; clashing with another row is a constraint violation.
    pub async fn update(&mut self, stored: Stored<T>, commit: bool) -> Result<Stored<T>, PersistenceError> {
        let assignments = T::COLUMNS
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {assignments} WHERE id = ?", T::TABLE);
        let conn = self.session.connection().await?;
        let result = bind_values(sqlx::query(&sql), stored.record.values())
            .bind(stored.id)
            .execute(conn)
            .await
            .map_err(|err| classify(T::TABLE, err))?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::Unmapped {
                table: T::TABLE,
                id: stored.id,
            });
        }
        self.finish(commit).await?;
        Ok(stored)
    }

    /// One page of rows across all seasons, in insertion order.
    pub async fn list(&mut self, limit: i64, offset: i64) -> Result<Vec<Stored<T>>, PersistenceError> {
        self.select_where(
            "ORDER BY id LIMIT ? OFFSET ?",
            vec![SqlValue::Int(Some(limit.max(0))), SqlValue::Int(Some(offset.max(0)))],
        )
        .await
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Stored<T>>, PersistenceError> {
        let sql = Self::select_sql("WHERE id = ?");
        let conn = self.session.connection().await?;
        let row = sqlx::query(&sql).bind(id).fetch_optional(conn).await?;
        row.as_ref().map(Self::decode).transpose()
    }

    /// Rows for one season in insertion order, optionally narrowed to a week.
    pub async fn find_by_season(
        &mut self,
        season: i32,
        week: Option<i32>,
    ) -> Result<Vec<Stored<T>>, PersistenceError> {
        let sql = Self::select_sql(&format!("{} ORDER BY id", Self::season_filter(week)?));
        let conn = self.session.connection().await?;
        let mut query = sqlx::query(&sql).bind(season);
        if let Some(week) = week {
            query = query.bind(week);
        }
        let rows = query.fetch_all(conn).await?;
        rows.iter().map(Self::decode).collect()
    }

    pub async fn count_by_season(
        &mut self,
        season: i32,
        week: Option<i32>,
    ) -> Result<i64, PersistenceError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} {}",
            T::TABLE,
            Self::season_filter(week)?
        );
        let conn = self.session.connection().await?;
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(season);
        if let Some(week) = week {
            query = query.bind(week);
        }
        Ok(query.fetch_one(conn).await?)
    }

    fn season_filter(week: Option<i32>) -> Result<&'static str, PersistenceError> {
        match week {
            None => Ok("WHERE season = ?"),
            Some(_) if T::has_column("week") => Ok("WHERE season = ? AND week = ?"),
            Some(_) => Err(PersistenceError::InvalidFilter {
                table: T::TABLE,
                column: "week",
            }),
        }
    }

    /// Removes a stored row and hands back its record.
    pub async fn delete(&mut self, stored: Stored<T>, commit: bool) -> Result<T, PersistenceError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let conn = self.session.connection().await?;
        let result = sqlx::query(&sql)
            .bind(stored.id)
            .execute(conn)
            .await
            .map_err(|err| classify(T::TABLE, err))?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::Unmapped {
                table: T::TABLE,
                id: stored.id,
            });
        }
        self.finish(commit).await?;
        Ok(stored.record)
    }
}

impl Repository<'_, GameWeather> {
    /// Conditions for one home game.
    pub async fn for_game(
        &mut self,
        season: i32,
        week: i32,
        home_team: &str,
    ) -> Result<Option<Stored<GameWeather>>, PersistenceError> {
        let mut rows = self
            .select_where(
                "WHERE season = ? AND week = ? AND team = ?",
                vec![
                    SqlValue::Int(Some(i64::from(season))),
                    SqlValue::Int(Some(i64::from(week))),
                    SqlValue::Text(Some(home_team.to_string())),
                ],
            )
            .await?;
        Ok(rows.pop())
    }

    /// Games of one week played in the open, by home team.
    pub async fn outdoor_games(
        &mut self,
        season: i32,
        week: i32,
    ) -> Result<Vec<Stored<GameWeather>>, PersistenceError> {
        self.select_where(
            "WHERE season = ? AND week = ? AND is_dome = 0 ORDER BY team",
            vec![
                SqlValue::Int(Some(i64::from(season))),
                SqlValue::Int(Some(i64::from(week))),
            ],
        )
        .await
    }
}

impl Repository<'_, InjuryReport> {
    /// One team's report for one week, by player.
    pub async fn for_team(
        &mut self,
        season: i32,
        week: i32,
        team: &str,
    ) -> Result<Vec<Stored<InjuryReport>>, PersistenceError> {
        self.select_where(
            "WHERE season = ? AND week = ? AND team = ? ORDER BY player",
            vec![
                SqlValue::Int(Some(i64::from(season))),
                SqlValue::Int(Some(i64::from(week))),
                SqlValue::Text(Some(team.to_string())),
            ],
        )
        .await
    }

    /// A player's designations across a season, by week.
    pub async fn for_player(
        &mut self,
        season: i32,
        player: &str,
    ) -> Result<Vec<Stored<InjuryReport>>, PersistenceError> {
        self.select_where(
            "WHERE season = ? AND player = ? ORDER BY week",
            vec![
                SqlValue::Int(Some(i64::from(season))),
                SqlValue::Text(Some(player.to_string())),
            ],
        )
        .await
    }
}
