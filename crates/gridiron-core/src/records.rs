//! Typed stat records, one per stat identifier, plus the row contract the
//! storage layer and the page parsers share.
//!
//! Every record carries `season` and `team`; the remaining natural-key
//! columns (`player`, `week`) depend on the table.

use serde::Serialize;

use crate::GridironError;

/// Column value handed to the storage layer for binding.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i64>),
    Real(Option<f64>),
    Text(Option<String>),
}

/// Source of typed field values, keyed by record field name.
pub trait FieldSource {
    fn season(&self) -> i32;
    fn int(&self, field: &str) -> Option<i64>;
    fn real(&self, field: &str) -> Option<f64>;
    fn text(&self, field: &str) -> Option<String>;
}

/// Row contract of a persisted stat record.
pub trait StatEntity:
    Sized + Clone + Send + Sync + Unpin + 'static + Into<StatRecord> + TryFrom<StatRecord, Error = GridironError>
{
    const TABLE: &'static str;
    /// Column order used for inserts and for `values()`.
    const COLUMNS: &'static [&'static str];
    const NATURAL_KEY: &'static [&'static str];

    fn season(&self) -> i32;
    fn team(&self) -> &str;
    fn values(&self) -> Vec<SqlValue>;
    /// Builds a record, or `None` when a natural-key field is missing.
    fn from_source(src: &dyn FieldSource) -> Option<Self>;

    fn has_column(name: &str) -> bool {
        Self::COLUMNS.contains(&name)
    }
}

macro_rules! field_type {
    (season) => { i32 };
    (flag) => { bool };
    (key_int) => { i32 };
    (key_text) => { String };
    (int) => { Option<i64> };
    (real) => { Option<f64> };
    (text) => { Option<String> };
}

macro_rules! field_value {
    (season, $v:expr) => { SqlValue::Int(Some(i64::from($v))) };
    (flag, $v:expr) => { SqlValue::Int(Some(i64::from($v))) };
    (key_int, $v:expr) => { SqlValue::Int(Some(i64::from($v))) };
    (key_text, $v:expr) => { SqlValue::Text(Some($v.clone())) };
    (int, $v:expr) => { SqlValue::Int($v) };
    (real, $v:expr) => { SqlValue::Real($v) };
    (text, $v:expr) => { SqlValue::Text($v.clone()) };
}

macro_rules! field_read {
    (season, $src:expr, $name:expr) => { $src.season() };
    (flag, $src:expr, $name:expr) => { $src.int($name).is_some_and(|v| v != 0) };
    (key_int, $src:expr, $name:expr) => { i32::try_from($src.int($name)?).ok()? };
    (key_text, $src:expr, $name:expr) => { $src.text($name)? };
    (int, $src:expr, $name:expr) => { $src.int($name) };
    (real, $src:expr, $name:expr) => { $src.real($name) };
    (text, $src:expr, $name:expr) => { $src.text($name) };
}

macro_rules! stat_record {
    (
        $(#[$meta:meta])*
        $name:ident in $table:literal keyed ($($key:ident),+) {
            $($field:ident: $kind:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
        pub struct $name {
            $(pub $field: field_type!($kind),)+
        }

        impl StatEntity for $name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];
            const NATURAL_KEY: &'static [&'static str] = &[$(stringify!($key)),+];

            fn season(&self) -> i32 {
                self.season
            }

            fn team(&self) -> &str {
                &self.team
            }

            fn values(&self) -> Vec<SqlValue> {
                vec![$(field_value!($kind, self.$field)),+]
            }

            fn from_source(src: &dyn FieldSource) -> Option<Self> {
                Some(Self {
                    $($field: field_read!($kind, src, stringify!($field)),)+
                })
            }
        }
    };
}

macro_rules! stat_record_enum {
    ($($variant:ident),+ $(,)?) => {
        /// Any parsed record, as produced by a stat handler's parse step.
        #[derive(Debug, Clone, PartialEq)]
        pub enum StatRecord {
            $($variant($variant),)+
        }

        impl StatRecord {
            pub fn table(&self) -> &'static str {
                match self {
                    $(StatRecord::$variant(_) => <$variant as StatEntity>::TABLE,)+
                }
            }

            pub fn season(&self) -> i32 {
                match self {
                    $(StatRecord::$variant(r) => r.season,)+
                }
            }

            pub fn team(&self) -> &str {
                match self {
                    $(StatRecord::$variant(r) => &r.team,)+
                }
            }
        }

        $(
            impl From<$variant> for StatRecord {
                fn from(record: $variant) -> Self {
                    StatRecord::$variant(record)
                }
            }

            impl TryFrom<StatRecord> for $variant {
                type Error = GridironError;

                fn try_from(record: StatRecord) -> Result<Self, Self::Error> {
                    match record {
                        StatRecord::$variant(inner) => Ok(inner),
                        other => Err(GridironError::Validation(format!(
                            "expected {} record, got {}",
                            <$variant as StatEntity>::TABLE,
                            other.table()
                        ))),
                    }
                }
            }
        )+
    };
}

stat_record! {
    /// Season totals for a team's offense (`team_stats` table).
    TeamOffense in "team_offense" keyed (season, team) {
        season: season,
        team: key_text,
        rank: int,
        games: int,
        points: int,
        total_yards: int,
        plays: int,
        yards_per_play: real,
        turnovers: int,
        fumbles_lost: int,
        first_downs: int,
        pass_cmp: int,
        pass_att: int,
        pass_yards: int,
        pass_td: int,
        pass_int: int,
        pass_net_yards_per_att: real,
        rush_att: int,
        rush_yards: int,
        rush_td: int,
        rush_yards_per_att: real,
        penalties: int,
        penalty_yards: int,
        score_pct: real,
        turnover_pct: real,
        expected_points: real,
    }
}

stat_record! {
    /// What opponents did against a team (`opp_stats` table).
    TeamDefense in "team_defense" keyed (season, team) {
        season: season,
        team: key_text,
        rank: int,
        games: int,
        points: int,
        total_yards: int,
        plays: int,
        yards_per_play: real,
        turnovers: int,
        fumbles_lost: int,
        first_downs: int,
        pass_cmp: int,
        pass_att: int,
        pass_yards: int,
        pass_td: int,
        pass_int: int,
        pass_net_yards_per_att: real,
        rush_att: int,
        rush_yards: int,
        rush_td: int,
        rush_yards_per_att: real,
        penalties: int,
        penalty_yards: int,
        score_pct: real,
        turnover_pct: real,
        expected_points: real,
    }
}

stat_record! {
    Standings in "standings" keyed (season, team) {
        season: season,
        team: key_text,
        wins: int,
        losses: int,
        ties: int,
        win_pct: real,
        points_for: int,
        points_against: int,
        point_diff: int,
        margin_of_victory: real,
        strength_of_schedule: real,
        srs: real,
        offense_srs: real,
        defense_srs: real,
    }
}

stat_record! {
    TeamKicking in "team_kicking" keyed (season, team) {
        season: season,
        team: key_text,
        rank: int,
        games: int,
        fga: int,
        fgm: int,
        fga_50_plus: int,
        fgm_50_plus: int,
        fg_long: int,
        fg_pct: real,
        xpa: int,
        xpm: int,
        xp_pct: real,
        kickoffs: int,
        kickoff_yards: int,
        touchbacks: int,
        touchback_pct: real,
        kickoff_avg: real,
    }
}

stat_record! {
    TeamPunting in "team_punting" keyed (season, team) {
        season: season,
        team: key_text,
        rank: int,
        games: int,
        punts: int,
        punt_yards: int,
        yards_per_punt: real,
        return_yards: int,
        net_yards: int,
        net_yards_per_punt: real,
        long: int,
        touchbacks: int,
        touchback_pct: real,
        inside_20: int,
        inside_20_pct: real,
        blocked: int,
    }
}

stat_record! {
    TeamReturns in "team_returns" keyed (season, team) {
        season: season,
        team: key_text,
        rank: int,
        games: int,
        punt_returns: int,
        punt_return_yards: int,
        punt_return_td: int,
        punt_return_long: int,
        punt_return_avg: real,
        kick_returns: int,
        kick_return_yards: int,
        kick_return_td: int,
        kick_return_long: int,
        kick_return_avg: real,
        all_purpose_yards: int,
    }
}

stat_record! {
    Passing in "passing_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        qb_record: text,
        completions: int,
        attempts: int,
        completion_pct: real,
        yards: int,
        td: int,
        interceptions: int,
        first_downs: int,
        long: int,
        yards_per_att: real,
        adj_yards_per_att: real,
        yards_per_game: real,
        rating: real,
        qbr: real,
        sacks: int,
        sack_yards: int,
    }
}

stat_record! {
    Rushing in "rushing_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        attempts: int,
        yards: int,
        td: int,
        first_downs: int,
        long: int,
        yards_per_att: real,
        yards_per_game: real,
        fumbles: int,
    }
}

stat_record! {
    Receiving in "receiving_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        targets: int,
        receptions: int,
        yards: int,
        yards_per_rec: real,
        td: int,
        first_downs: int,
        long: int,
        catch_pct: real,
        yards_per_target: real,
        fumbles: int,
    }
}

stat_record! {
    Defense in "defense_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        interceptions: int,
        int_yards: int,
        int_td: int,
        passes_defended: int,
        forced_fumbles: int,
        fumble_recoveries: int,
        sacks: real,
        tackles_combined: int,
        tackles_solo: int,
        tackles_assists: int,
        tackles_for_loss: int,
        qb_hits: int,
        safeties: int,
    }
}

stat_record! {
    Kicking in "kicking_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        fga: int,
        fgm: int,
        fg_long: int,
        fg_pct: real,
        xpa: int,
        xpm: int,
        xp_pct: real,
        kickoffs: int,
        touchbacks: int,
    }
}

stat_record! {
    Punting in "punting_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        punts: int,
        punt_yards: int,
        yards_per_punt: real,
        net_yards_per_punt: real,
        long: int,
        inside_20: int,
        touchbacks: int,
        blocked: int,
    }
}

stat_record! {
    Returns in "return_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        punt_returns: int,
        punt_return_yards: int,
        punt_return_td: int,
        kick_returns: int,
        kick_return_yards: int,
        kick_return_td: int,
        all_purpose_yards: int,
    }
}

stat_record! {
    Scoring in "scoring_stats" keyed (season, team, player) {
        season: season,
        team: key_text,
        player: key_text,
        rank: int,
        age: int,
        position: text,
        games: int,
        games_started: int,
        rush_td: int,
        rec_td: int,
        punt_return_td: int,
        kick_return_td: int,
        all_td: int,
        two_point: int,
        xpm: int,
        fgm: int,
        safeties: int,
        points: int,
        points_per_game: real,
    }
}

stat_record! {
    /// One game from the season schedule, keyed on the winning side.
    Games in "games" keyed (season, team, week) {
        season: season,
        week: key_int,
        team: key_text,
        opponent: text,
        location: text,
        game_day: text,
        game_date: text,
        kickoff_time: text,
        team_points: int,
        opponent_points: int,
        team_yards: int,
        team_turnovers: int,
        opponent_yards: int,
        opponent_turnovers: int,
    }
}

stat_record! {
    /// Weekly injury designation (Questionable, Doubtful, Out, IR) for one player.
    InjuryReport in "injury_reports" keyed (season, team, player, week) {
        season: season,
        week: key_int,
        team: key_text,
        player: key_text,
        position: text,
        designation: text,
        injury_type: text,
        report_date: text,
    }
}

stat_record! {
    /// Conditions at kickoff for one game. `team` is the home side; domed
    /// stadiums carry no conditions.
    GameWeather in "game_weather" keyed (season, team, week) {
        season: season,
        week: key_int,
        team: key_text,
        stadium: text,
        is_dome: flag,
        temperature: real,
        wind_speed: real,
        precipitation: real,
        humidity: real,
        weather_condition: text,
        game_time: text,
        fetched_at: text,
    }
}

stat_record! {
    /// One sportsbook line snapshot. `team` is the home side; several
    /// snapshots per game track line movement.
    Odds in "odds" keyed (season, week, team, sportsbook, captured_at) {
        season: season,
        week: key_int,
        team: key_text,
        opponent: text,
        game_date: text,
        sportsbook: key_text,
        captured_at: key_text,
        spread_home: real,
        spread_away: real,
        moneyline_home: int,
        moneyline_away: int,
        over_under: real,
        is_opening: flag,
        is_closing: flag,
    }
}

stat_record_enum! {
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
    Odds,
    InjuryReport,
    GameWeather,
}

/// Every record table, in ledger order.
pub const RECORD_TABLES: [&str; 18] = [
    TeamOffense::TABLE,
    TeamDefense::TABLE,
    Standings::TABLE,
    TeamKicking::TABLE,
    TeamPunting::TABLE,
    TeamReturns::TABLE,
    Passing::TABLE,
    Rushing::TABLE,
    Receiving::TABLE,
    Defense::TABLE,
    Kicking::TABLE,
    Punting::TABLE,
    Returns::TABLE,
    Scoring::TABLE,
    Games::TABLE,
    Odds::TABLE,
    InjuryReport::TABLE,
    GameWeather::TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapSource {
        season: i32,
        values: HashMap<&'static str, &'static str>,
    }

    impl FieldSource for MapSource {
        fn season(&self) -> i32 {
            self.season
        }
        fn int(&self, field: &str) -> Option<i64> {
            self.values.get(field)?.parse().ok()
        }
        fn real(&self, field: &str) -> Option<f64> {
            self.values.get(field)?.parse().ok()
        }
        fn text(&self, field: &str) -> Option<String> {
            self.values.get(field).map(|v| v.to_string())
        }
    }

    #[test]
    fn columns_and_values_line_up() {
        let src = MapSource {
            season: 2023,
            values: HashMap::from([("team", "KAN"), ("wins", "11"), ("win_pct", "0.647")]),
        };
        let standings = Standings::from_source(&src).unwrap();
        let values = standings.values();
        assert_eq!(values.len(), Standings::COLUMNS.len());
        assert_eq!(values[0], SqlValue::Int(Some(2023)));
        assert_eq!(values[1], SqlValue::Text(Some("KAN".into())));
        assert_eq!(standings.wins, Some(11));
        assert_eq!(standings.losses, None);
        assert_eq!(Standings::NATURAL_KEY, &["season", "team"]);
    }

    #[test]
    fn missing_key_field_yields_none() {
        let src = MapSource {
            season: 2023,
            values: HashMap::from([("team", "KAN")]),
        };
        assert!(Passing::from_source(&src).is_none());
        assert!(Games::from_source(&src).is_none());
        assert!(Games::has_column("week"));
        assert!(!Passing::has_column("week"));
    }

    #[test]
    fn record_enum_conversions_check_the_variant() {
        let src = MapSource {
            season: 2024,
            values: HashMap::from([("team", "BUF")]),
        };
        let record: StatRecord = TeamOffense::from_source(&src).unwrap().into();
        assert_eq!(record.table(), "team_offense");
        assert_eq!(record.season(), 2024);
        assert!(TeamDefense::try_from(record.clone()).is_err());
        assert_eq!(TeamOffense::try_from(record).unwrap().team, "BUF");
    }

    #[test]
    fn flags_default_to_false_and_bind_as_integers() {
        let src = MapSource {
            season: 2024,
            values: HashMap::from([("team", "Green Bay Packers"), ("week", "5")]),
        };
        let weather = GameWeather::from_source(&src).unwrap();
        assert!(!weather.is_dome);
        assert_eq!(weather.values()[4], SqlValue::Int(Some(0)));

        let src = MapSource {
            season: 2024,
            values: HashMap::from([("team", "Detroit Lions"), ("week", "5"), ("is_dome", "1")]),
        };
        assert!(GameWeather::from_source(&src).unwrap().is_dome);
        assert_eq!(InjuryReport::NATURAL_KEY, &["season", "team", "player", "week"]);
        assert!(Odds::NATURAL_KEY.contains(&"sportsbook"));
    }
}
