//! Kickoff conditions per home game: stadiums from the season schedule,
//! current conditions for open-air stadiums from OpenWeatherMap.

use std::collections::HashMap;

use async_trait::async_trait;
use gridiron_core::{GameWeather, GridironError, StatEntity, StatId, StatRecord};
use gridiron_storage::{FetchOptions, RawPayload, ScrapeBackend, Session};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::handler::{stored_rows, upsert_records, ScrapeContext, StatHandler};
use crate::pfr::{self, PfrRow, TableSelection};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stadium {
    pub team: &'static str,
    pub name: &'static str,
    pub is_dome: bool,
    pub latitude: f64,
    pub longitude: f64,
}

const fn stadium(
    team: &'static str,
    name: &'static str,
    is_dome: bool,
    latitude: f64,
    longitude: f64,
) -> Stadium {
    Stadium { team, name, is_dome, latitude, longitude }
}

/// Home stadium of every franchise, by the team name PFR prints.
/// Retractable roofs count as domes.
pub const STADIUMS: &[Stadium] = &[
    stadium("Arizona Cardinals", "State Farm Stadium", true, 33.5276, -112.2626),
    stadium("Atlanta Falcons", "Mercedes-Benz Stadium", true, 33.7553, -84.4009),
    stadium("Baltimore Ravens", "M&T Bank Stadium", false, 39.2780, -76.6227),
    stadium("Buffalo Bills", "Highmark Stadium", false, 42.7738, -78.7870),
    stadium("Carolina Panthers", "Bank of America Stadium", false, 35.2258, -80.8530),
    stadium("Chicago Bears", "Soldier Field", false, 41.8623, -87.6167),
    stadium("Cincinnati Bengals", "Paycor Stadium", false, 39.0954, -84.5160),
    stadium("Cleveland Browns", "Cleveland Browns Stadium", false, 41.5061, -81.6995),
    stadium("Dallas Cowboys", "AT&T Stadium", true, 32.7473, -97.0945),
    stadium("Denver Broncos", "Empower Field at Mile High", false, 39.7439, -105.0201),
    stadium("Detroit Lions", "Ford Field", true, 42.3400, -83.0456),
    stadium("Green Bay Packers", "Lambeau Field", false, 44.5013, -88.0622),
    stadium("Houston Texans", "NRG Stadium", true, 29.6847, -95.4107),
    stadium("Indianapolis Colts", "Lucas Oil Stadium", true, 39.7601, -86.1639),
    stadium("Jacksonville Jaguars", "EverBank Stadium", false, 30.3239, -81.6373),
    stadium("Kansas City Chiefs", "GEHA Field at Arrowhead Stadium", false, 39.0489, -94.4839),
    stadium("Los Angeles Chargers", "SoFi Stadium", true, 33.9535, -118.3392),
    stadium("Los Angeles Rams", "SoFi Stadium", true, 33.9535, -118.3392),
    stadium("Las Vegas Raiders", "Allegiant Stadium", true, 36.0909, -115.1833),
    stadium("Miami Dolphins", "Hard Rock Stadium", false, 25.9580, -80.2389),
    stadium("Minnesota Vikings", "U.S. Bank Stadium", true, 44.9738, -93.2577),
    stadium("New England Patriots", "Gillette Stadium", false, 42.0909, -71.2643),
    stadium("New Orleans Saints", "Caesars Superdome", true, 29.9511, -90.0812),
    stadium("New York Giants", "MetLife Stadium", false, 40.8128, -74.0742),
    stadium("New York Jets", "MetLife Stadium", false, 40.8128, -74.0742),
    stadium("Philadelphia Eagles", "Lincoln Financial Field", false, 39.9008, -75.1675),
    stadium("Pittsburgh Steelers", "Acrisure Stadium", false, 40.4468, -80.0158),
    stadium("Seattle Seahawks", "Lumen Field", false, 47.5952, -122.3316),
    stadium("San Francisco 49ers", "Levi's Stadium", false, 37.4032, -121.9698),
    stadium("Tampa Bay Buccaneers", "Raymond James Stadium", false, 27.9759, -82.5033),
    stadium("Tennessee Titans", "Nissan Stadium", false, 36.1665, -86.7713),
    stadium("Washington Commanders", "Northwest Stadium", false, 38.9076, -76.8645),
];

pub fn stadium_for(team: &str) -> Option<&'static Stadium> {
    STADIUMS.iter().find(|s| s.team.eq_ignore_ascii_case(team.trim()))
}

/// Weather observed at a stadium. Precipitation is the last hour of rain
/// plus snow, in inches as the feed reports it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
    pub humidity: Option<f64>,
    pub weather_condition: Option<String>,
}

#[derive(Deserialize)]
struct CurrentWeather {
    main: Option<Readings>,
    wind: Option<Wind>,
    #[serde(default)]
    weather: Vec<Sky>,
    rain: Option<LastHour>,
    snow: Option<LastHour>,
}

#[derive(Deserialize)]
struct Readings {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Deserialize)]
struct Wind {
    speed: Option<f64>,
}

#[derive(Deserialize)]
struct Sky {
    main: Option<String>,
}

#[derive(Deserialize)]
struct LastHour {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

impl Conditions {
    pub fn from_current_json(body: &str) -> Result<Self, serde_json::Error> {
        let current: CurrentWeather = serde_json::from_str(body)?;
        let hourly = |h: &Option<LastHour>| h.as_ref().and_then(|h| h.one_hour).unwrap_or(0.0);
        Ok(Self {
            temperature: current.main.as_ref().and_then(|m| m.temp),
            humidity: current.main.as_ref().and_then(|m| m.humidity),
            wind_speed: current.wind.and_then(|w| w.speed),
            precipitation: Some(hourly(&current.rain) + hourly(&current.snow)),
            weather_condition: current.weather.into_iter().next().and_then(|s| s.main),
        })
    }
}

/// OpenWeatherMap current-conditions endpoint, in Fahrenheit and mph.
#[derive(Clone)]
pub struct WeatherFeed {
    pub base_url: String,
    api_key: String,
}

impl std::fmt::Debug for WeatherFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherFeed")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WeatherFeed {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENWEATHER_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn current_url(&self, stadium: &Stadium) -> String {
        format!(
            "{}/data/2.5/weather?lat={}&lon={}&appid={}&units=imperial",
            self.base_url.trim_end_matches('/'),
            stadium.latitude,
            stadium.longitude,
            self.api_key
        )
    }

    /// Current conditions at `stadium`. Error text never carries the key.
    pub fn current(
        &self,
        backend: &dyn ScrapeBackend,
        options: &FetchOptions,
        stadium: &Stadium,
    ) -> Result<Conditions, GridironError> {
        let redact = |text: String| text.replace(&self.api_key, "***");
        let payload = backend
            .fetch(&self.current_url(stadium), options)
            .map_err(|err| GridironError::BackendFetch(redact(err.to_string())))?;
        Conditions::from_current_json(&payload.body).map_err(|err| {
            GridironError::BackendFetch(format!("weather feed for {}: {err}", stadium.name))
        })
    }
}

/// `(week, home team)` of a played-or-scheduled game; neutral sites have no home.
fn home_game(row: &PfrRow) -> Option<(i32, String)> {
    let week = i32::try_from(pfr::parse_week(row.get("week_num")?)?).ok()?;
    let winner = pfr::clean_name(row.get("winner")?)?;
    let loser = pfr::clean_name(row.get("loser")?)?;
    match row.get("game_location").map(|s| s.trim()) {
        Some("N") => None,
        Some("@") => Some((week, loser)),
        _ => Some((week, winner)),
    }
}

/// Weather rows for the home games of a season.
///
/// Parsing the schedule yields stadium rows only; `scrape` fills in
/// conditions for open-air stadiums when a weather feed is configured, and
/// keeps the row without conditions when the feed fails.
pub struct WeatherHandler;

impl WeatherHandler {
    fn games(&self, payload: &RawPayload, season: i32) -> Result<Vec<GameWeather>, GridironError> {
        let rows = pfr::extract_rows(&payload.body, TableSelection::FirstOf(&["games"]))
            .map_err(|cause| GridironError::BackendFetch(format!("{}: {cause}", payload.url)))?;
        let fetched_at = payload.fetched_at.to_rfc3339();
        let mut games = Vec::new();
        for row in &rows {
            let Some((week, home)) = home_game(row) else {
                continue;
            };
            let Some(stadium) = stadium_for(&home) else {
                debug!(team = %home, week, "no stadium on file, skipping game");
                continue;
            };
            let game_time = match (row.get("game_date"), row.get("gametime")) {
                (Some(date), Some(time)) if !date.is_empty() && !time.is_empty() => {
                    Some(format!("{date} {time}"))
                }
                (Some(date), _) => pfr::clean_text(date),
                _ => None,
            };
            games.push(GameWeather {
                season,
                week,
                team: home,
                stadium: Some(stadium.name.to_string()),
                is_dome: stadium.is_dome,
                temperature: None,
                wind_speed: None,
                precipitation: None,
                humidity: None,
                weather_condition: None,
                game_time,
                fetched_at: Some(fetched_at.clone()),
            });
        }
        if games.is_empty() {
            return Err(GridironError::BackendFetch(format!(
                "{}: empty payload",
                payload.url
            )));
        }
        Ok(games)
    }
}

#[async_trait]
impl StatHandler for WeatherHandler {
    fn stat(&self) -> StatId {
        StatId::Weather
    }

    fn table(&self) -> &'static str {
        GameWeather::TABLE
    }

    fn url(&self, ctx: &ScrapeContext, season: i32) -> String {
        ctx.season_url(season, "games.htm")
    }

    fn parse(&self, payload: &RawPayload, season: i32) -> Result<Vec<StatRecord>, GridironError> {
        Ok(self
            .games(payload, season)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    fn scrape(&self, ctx: &ScrapeContext, season: i32) -> Result<Vec<StatRecord>, GridironError> {
        let payload = self.fetch(ctx, season)?;
        let mut games = self.games(&payload, season)?;
        if let Some(feed) = &ctx.weather {
            let mut seen: HashMap<String, Option<Conditions>> = HashMap::new();
            for game in games.iter_mut().filter(|g| !g.is_dome) {
                let conditions = seen.entry(game.team.clone()).or_insert_with(|| {
                    let stadium = stadium_for(&game.team)?;
                    feed.current(ctx.backend.as_ref(), &ctx.options, stadium)
                        .map_err(|err| {
                            warn!(team = %game.team, error = %err, "weather feed failed, storing stadium only");
                        })
                        .ok()
                });
                if let Some(c) = conditions {
                    game.temperature = c.temperature;
                    game.wind_speed = c.wind_speed;
                    game.precipitation = c.precipitation;
                    game.humidity = c.humidity;
                    game.weather_condition = c.weather_condition.clone();
                }
            }
        }
        Ok(games.into_iter().map(Into::into).collect())
    }

    async fn persist(
        &self,
        session: &mut Session,
        records: Vec<StatRecord>,
    ) -> Result<usize, GridironError> {
        upsert_records::<GameWeather>(session, records).await
    }

    async fn stored(
        &self,
        session: &mut Session,
        season: i32,
        week: Option<i32>,
    ) -> Result<Vec<serde_json::Value>, GridironError> {
        stored_rows::<GameWeather>(session, season, week).await
    }
}
