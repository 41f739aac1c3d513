use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GridironError;

/// Closed set of stat identifiers the service knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatId {
    TeamOffense,
    TeamDefense,
    Standings,
    TeamKicking,
    TeamPunting,
    TeamReturns,
    Passing,
    Rushing,
    Receiving,
    Defense,
    Kicking,
    Punting,
    Returns,
    Scoring,
    Games,
    Injuries,
    Weather,
}

impl StatId {
    pub const ALL: [StatId; 17] = [
        StatId::TeamOffense,
        StatId::TeamDefense,
        StatId::Standings,
        StatId::TeamKicking,
        StatId::TeamPunting,
        StatId::TeamReturns,
        StatId::Passing,
        StatId::Rushing,
        StatId::Receiving,
        StatId::Defense,
        StatId::Kicking,
        StatId::Punting,
        StatId::Returns,
        StatId::Scoring,
        StatId::Games,
        StatId::Injuries,
        StatId::Weather,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatId::TeamOffense => "team_offense",
            StatId::TeamDefense => "team_defense",
            StatId::Standings => "standings",
            StatId::TeamKicking => "team_kicking",
            StatId::TeamPunting => "team_punting",
            StatId::TeamReturns => "team_returns",
            StatId::Passing => "passing",
            StatId::Rushing => "rushing",
            StatId::Receiving => "receiving",
            StatId::Defense => "defense",
            StatId::Kicking => "kicking",
            StatId::Punting => "punting",
            StatId::Returns => "returns",
            StatId::Scoring => "scoring",
            StatId::Games => "games",
            StatId::Injuries => "injuries",
            StatId::Weather => "weather",
        }
    }
}

impl fmt::Display for StatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatId {
    type Err = GridironError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        StatId::ALL
            .into_iter()
            .find(|id| id.as_str() == needle)
            .ok_or_else(|| GridironError::UnknownStat(needle.to_string()))
    }
}

pub const MIN_SEASON: i32 = 1920;
pub const MAX_SEASON: i32 = 2100;

/// Rejects seasons the upstream source cannot have.
pub fn validate_season(season: i32) -> Result<i32, GridironError> {
    if (MIN_SEASON..=MAX_SEASON).contains(&season) {
        Ok(season)
    } else {
        Err(GridironError::Validation(format!(
            "season {season} outside {MIN_SEASON}..={MAX_SEASON}"
        )))
    }
}
