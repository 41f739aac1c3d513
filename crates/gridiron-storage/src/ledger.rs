use std::collections::{HashMap, HashSet};

use gridiron_core::GridironError;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

const VERSION_TABLE: &str = "schema_revision";

/// One forward-only schema change and the tables it introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub id: &'static str,
    pub down_revision: Option<&'static str>,
    pub description: &'static str,
    pub tables: &'static [&'static str],
    pub sql: &'static str,
}

pub const BASELINE_REVISIONS: [Revision; 7] = [
    Revision {
        id: "001_scrape_jobs",
        down_revision: None,
        description: "batch job progress",
        tables: &["scrape_jobs"],
        sql: include_str!("../../../migrations/001_create_scrape_jobs.sql"),
    },
    Revision {
        id: "002_team_stats",
        down_revision: Some("001_scrape_jobs"),
        description: "team season tables",
        tables: &[
            "team_offense",
            "team_defense",
            "standings",
            "team_kicking",
            "team_punting",
            "team_returns",
        ],
        sql: include_str!("../../../migrations/002_create_team_stat_tables.sql"),
    },
    Revision {
        id: "003_player_stats",
        down_revision: Some("002_team_stats"),
        description: "player season tables",
        tables: &[
            "passing_stats",
            "rushing_stats",
            "receiving_stats",
            "defense_stats",
            "kicking_stats",
            "punting_stats",
            "return_stats",
            "scoring_stats",
        ],
        sql: include_str!("../../../migrations/003_create_player_stat_tables.sql"),
    },
    Revision {
        id: "004_games",
        down_revision: Some("003_player_stats"),
        description: "season schedule and results",
        tables: &["games"],
        sql: include_str!("../../../migrations/004_create_games_table.sql"),
    },
    Revision {
        id: "005_odds",
        down_revision: Some("004_games"),
        description: "sportsbook lines",
        tables: &["odds"],
        sql: include_str!("../../../migrations/005_create_odds_table.sql"),
    },
    Revision {
        id: "006_injury_reports",
        down_revision: Some("005_odds"),
        description: "weekly injury designations",
        tables: &["injury_reports"],
        sql: include_str!("../../../migrations/006_create_injury_reports_table.sql"),
    },
    Revision {
        id: "007_game_weather",
        down_revision: Some("006_injury_reports"),
        description: "kickoff conditions per home game",
        tables: &["game_weather"],
        sql: include_str!("../../../migrations/007_create_game_weather_table.sql"),
    },
];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("duplicate revision id {0}")]
    DuplicateRevision(String),
    #[error("revision {revision} points at unknown predecessor {down_revision}")]
    MissingPredecessor {
        revision: String,
        down_revision: String,
    },
    #[error("ledger has {0} root revisions, expected exactly one")]
    Roots(usize),
    #[error("revision {0} has more than one successor")]
    Branch(String),
    #[error("revisions not reachable from the root: {0:?}")]
    Unreachable(Vec<String>),
    #[error("table {0} is not declared by any revision")]
    Undeclared(String),
    #[error("store is at revision {0}, which the ledger does not contain")]
    UnknownRevision(String),
    #[error("applying revision {revision} failed: {source}")]
    Apply {
        revision: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("table {0} is missing from the store")]
    MissingTable(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<MigrationError> for GridironError {
    fn from(err: MigrationError) -> Self {
        GridironError::Migration(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    pub from: Option<String>,
    pub to: String,
    pub applied: Vec<String>,
}

/// Linear, validated chain of schema revisions.
///
/// The store records the single revision it is at in `schema_revision`.
/// Upgrading applies every later revision in order, each in its own
/// transaction together with the version bump.
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    chain: Vec<Revision>,
}

impl MigrationLedger {
    pub fn baseline() -> Result<Self, MigrationError> {
        Self::new(BASELINE_REVISIONS.to_vec())
    }

    pub fn new(revisions: Vec<Revision>) -> Result<Self, MigrationError> {
        let mut ids = HashSet::new();
        for rev in &revisions {
            if !ids.insert(rev.id) {
                return Err(MigrationError::DuplicateRevision(rev.id.to_string()));
            }
        }
        for rev in &revisions {
            if let Some(down) = rev.down_revision {
                if !ids.contains(down) {
                    return Err(MigrationError::MissingPredecessor {
                        revision: rev.id.to_string(),
                        down_revision: down.to_string(),
                    });
                }
            }
        }

        let roots: Vec<&Revision> = revisions
            .iter()
            .filter(|rev| rev.down_revision.is_none())
            .collect();
        let [root] = roots.as_slice() else {
            return Err(MigrationError::Roots(roots.len()));
        };

        let mut successors: HashMap<&str, &Revision> = HashMap::new();
        for rev in &revisions {
            if let Some(down) = rev.down_revision {
                if successors.insert(down, rev).is_some() {
                    return Err(MigrationError::Branch(down.to_string()));
                }
            }
        }

        let mut chain = vec![**root];
        while let Some(next) = chain.last().and_then(|rev| successors.get(rev.id)) {
            if chain.len() > revisions.len() {
                break;
            }
            chain.push(**next);
        }
        if chain.len() != revisions.len() {
            let reached: HashSet<&str> = chain.iter().map(|rev| rev.id).collect();
            let mut stranded: Vec<String> = revisions
                .iter()
                .filter(|rev| !reached.contains(rev.id))
                .map(|rev| rev.id.to_string())
                .collect();
            stranded.sort();
            return Err(MigrationError::Unreachable(stranded));
        }

        Ok(Self { chain })
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.chain
    }

    pub fn head(&self) -> &str {
        self.chain.last().map(|rev| rev.id).unwrap_or_default()
    }

    pub fn declares(&self, table: &str) -> bool {
        self.chain.iter().any(|rev| rev.tables.contains(&table))
    }

    /// Fails on the first table no revision creates. Run before anything
    /// is persisted.
    pub fn ensure_declared<'a>(
        &self,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), MigrationError> {
        for table in tables {
            if !self.declares(table) {
                return Err(MigrationError::Undeclared(table.to_string()));
            }
        }
        Ok(())
    }

    /// Revision the store is at, or `None` for an unversioned store.
    pub async fn current_revision(&self, pool: &SqlitePool) -> Result<Option<String>, MigrationError> {
        if !table_exists(pool, VERSION_TABLE).await? {
            return Ok(None);
        }
        let current: Option<String> =
            sqlx::query_scalar("SELECT version_num FROM schema_revision LIMIT 1")
                .fetch_optional(pool)
                .await?;
        Ok(current)
    }

    /// Brings the store to head. A store already at head is left untouched.
    pub async fn upgrade_to_head(&self, pool: &SqlitePool) -> Result<UpgradeReport, MigrationError> {
        let from = self.current_revision(pool).await?;
        let start = match &from {
            None => 0,
            Some(current) => self
                .chain
                .iter()
                .position(|rev| rev.id == current)
                .map(|idx| idx + 1)
                .ok_or_else(|| MigrationError::UnknownRevision(current.clone()))?,
        };

        sqlx::query("CREATE TABLE IF NOT EXISTS schema_revision (version_num TEXT NOT NULL)")
            .execute(pool)
            .await?;

        let mut applied = Vec::new();
        for rev in &self.chain[start..] {
            let mut tx = pool.begin().await?;
            sqlx::raw_sql(rev.sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| MigrationError::Apply {
                    revision: rev.id.to_string(),
                    source,
                })?;
            sqlx::query("DELETE FROM schema_revision")
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO schema_revision (version_num) VALUES (?)")
                .bind(rev.id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            info!(revision = rev.id, description = rev.description, "applied schema revision");
            applied.push(rev.id.to_string());
        }

        Ok(UpgradeReport {
            from,
            to: self.head().to_string(),
            applied,
        })
    }

    /// Confirms each named table exists in the store.
    pub async fn verify_tables<'a>(
        &self,
        pool: &SqlitePool,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), MigrationError> {
        for table in tables {
            if !table_exists(pool, table).await? {
                return Err(MigrationError::MissingTable(table.to_string()));
            }
        }
        Ok(())
    }
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(id: &'static str, down: Option<&'static str>) -> Revision {
        Revision {
            id,
            down_revision: down,
            description: "",
            tables: &[],
            sql: "",
        }
    }

    #[test]
    fn baseline_chain_is_linear_and_declares_every_record_table() {
        let ledger = MigrationLedger::baseline().unwrap();
        assert_eq!(ledger.head(), "007_game_weather");
        assert_eq!(ledger.revisions().len(), 7);
        ledger
            .ensure_declared(gridiron_core::RECORD_TABLES)
            .unwrap();
        assert!(ledger.declares("scrape_jobs"));
        assert!(matches!(
            ledger.ensure_declared(["injuries"]),
            Err(MigrationError::Undeclared(ref t)) if t == "injuries"
        ));
    }

    #[test]
    fn chain_is_ordered_from_the_root_regardless_of_input_order() {
        let ledger =
            MigrationLedger::new(vec![rev("c", Some("b")), rev("a", None), rev("b", Some("a"))])
                .unwrap();
        let ids: Vec<_> = ledger.revisions().iter().map(|r| r.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn malformed_chains_are_rejected() {
        assert!(matches!(
            MigrationLedger::new(vec![rev("a", None), rev("a", None)]),
            Err(MigrationError::DuplicateRevision(_))
        ));
        assert!(matches!(
            MigrationLedger::new(vec![rev("a", None), rev("b", Some("zz"))]),
            Err(MigrationError::MissingPredecessor { .. })
        ));
        assert!(matches!(
            MigrationLedger::new(vec![rev("a", None), rev("b", None)]),
            Err(MigrationError::Roots(2))
        ));
        assert!(matches!(
            MigrationLedger::new(vec![]),
            Err(MigrationError::Roots(0))
        ));
        assert!(matches!(
            MigrationLedger::new(vec![rev("a", None), rev("b", Some("a")), rev("c", Some("a"))]),
            Err(MigrationError::Branch(ref id)) if id == "a"
        ));
        assert!(matches!(
            MigrationLedger::new(vec![rev("a", None), rev("x", Some("y")), rev("y", Some("x"))]),
            Err(MigrationError::Unreachable(ref ids)) if ids == &["x", "y"]
        ));
    }
}
