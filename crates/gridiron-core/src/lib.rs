//! Core domain model for the gridiron stats service: stat identifiers,
//! typed season records, batch job state and the shared error taxonomy.

mod error;
mod job;
mod records;
mod stat;

pub use error::GridironError;
pub use job::{derive_status, ItemStatus, JobStatus, ScrapeJob, StatResult};
pub use records::{
    Defense, FieldSource, GameWeather, Games, InjuryReport, Kicking, Odds, Passing, Punting,
    Receiving, Returns, Rushing, Scoring, SqlValue, Standings, StatEntity, StatRecord,
    TeamDefense, TeamKicking, TeamOffense, TeamPunting, TeamReturns, RECORD_TABLES,
};
pub use stat::{validate_season, StatId, MAX_SEASON, MIN_SEASON};

pub const CRATE_NAME: &str = "gridiron-core";
