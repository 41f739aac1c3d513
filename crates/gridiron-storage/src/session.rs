use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::repository::PersistenceError;

/// Hands out sessions bound to one connection pool.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    pool: SqlitePool,
}

impl SessionFactory {
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn open(&self) -> Session {
        Session {
            pool: self.pool.clone(),
            tx: None,
        }
    }
}

/// Unit of work. The first statement opens a transaction that stays open
/// until `commit` or `rollback`; dropping an uncommitted session rolls back.
pub struct Session {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl Session {
    pub(crate) async fn connection(&mut self) -> Result<&mut SqliteConnection, sqlx::Error> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await?);
        }
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(sqlx::Error::PoolClosed),
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    pub async fn commit(&mut self) -> Result<(), PersistenceError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            debug!("session committed");
        }
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<(), PersistenceError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("session rolled back");
        }
        Ok(())
    }
}
