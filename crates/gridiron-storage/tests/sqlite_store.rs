use chrono::Utc;
use gridiron_core::{
    GameWeather, Games, InjuryReport, JobStatus, Passing, ScrapeJob, StatResult, TeamOffense,
    RECORD_TABLES,
};
use gridiron_storage::{
    open_migrated, JobStore, MigrationError, MigrationLedger, PersistenceError, Repository,
    SessionFactory, JOBS_TABLE,
};
use tempfile::TempDir;

async fn fresh_store() -> (TempDir, SessionFactory) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("gridiron.db").display());
    let factory = open_migrated(&url).await.expect("migrated store");
    (dir, factory)
}

fn offense(season: i32, team: &str, points: i64) -> TeamOffense {
    TeamOffense {
        season,
        team: team.to_string(),
        rank: Some(1),
        games: Some(17),
        points: Some(points),
        total_yards: Some(6000),
        plays: None,
        yards_per_play: Some(5.9),
        turnovers: None,
        fumbles_lost: None,
        first_downs: None,
        pass_cmp: None,
        pass_att: None,
        pass_yards: None,
        pass_td: None,
        pass_int: None,
        pass_net_yards_per_att: None,
        rush_att: None,
        rush_yards: None,
        rush_td: None,
        rush_yards_per_att: None,
        penalties: None,
        penalty_yards: None,
        score_pct: None,
        turnover_pct: None,
        expected_points: None,
    }
}

fn game(season: i32, week: i32, team: &str) -> Games {
    Games {
        season,
        week,
        team: team.to_string(),
        opponent: Some("OPP".to_string()),
        location: None,
        game_day: Some("Sun".to_string()),
        game_date: Some("2024-09-08".to_string()),
        kickoff_time: None,
        team_points: Some(24),
        opponent_points: Some(17),
        team_yards: None,
        team_turnovers: None,
        opponent_yards: None,
        opponent_turnovers: None,
    }
}

fn weather(week: i32, team: &str, is_dome: bool, temperature: Option<f64>) -> GameWeather {
    GameWeather {
        season: 2024,
        week,
        team: team.to_string(),
        stadium: None,
        is_dome,
        temperature,
        wind_speed: None,
        precipitation: None,
        humidity: None,
        weather_condition: None,
        game_time: None,
        fetched_at: None,
    }
}

fn injury(week: i32, team: &str, player: &str, designation: &str) -> InjuryReport {
    InjuryReport {
        season: 2024,
        week,
        team: team.to_string(),
        player: player.to_string(),
        position: None,
        designation: Some(designation.to_string()),
        injury_type: None,
        report_date: None,
    }
}

#[tokio::test]
async fn create_read_delete_cycle() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut repo = Repository::<TeamOffense>::new(&mut session);

    let stored = repo.create(offense(9999, "TST", 100), true).await.unwrap();
    let rows = repo.find_by_season(9999, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record().team, "TST");
    assert_eq!(rows[0].record().points, Some(100));
    assert_eq!(rows[0].record().yards_per_play, Some(5.9));

    let found = repo.find_by_id(stored.id()).await.unwrap().unwrap();
    assert_eq!(found, stored);

    let again = stored.clone();
    repo.delete(stored, true).await.unwrap();
    assert!(repo.find_by_season(9999, None).await.unwrap().is_empty());
    assert!(matches!(
        repo.delete(again, true).await,
        Err(PersistenceError::Unmapped { table: "team_offense", .. })
    ));
}

#[tokio::test]
async fn duplicate_natural_key_is_a_constraint_violation_and_upsert_overwrites() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut repo = Repository::<TeamOffense>::new(&mut session);

    let first = repo.create(offense(2024, "KAN", 300), true).await.unwrap();
    let err = repo.create(offense(2024, "KAN", 301), true).await.unwrap_err();
    assert!(matches!(err, PersistenceError::ConstraintViolation { .. }));

    let updated = repo.upsert(offense(2024, "KAN", 412), true).await.unwrap();
    assert_eq!(updated.id(), first.id());
    let rows = repo.find_by_season(2024, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record().points, Some(412));
}

#[tokio::test]
async fn season_queries_never_leak_other_seasons() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut repo = Repository::<TeamOffense>::new(&mut session);
    repo.upsert(offense(2023, "KAN", 371), false).await.unwrap();
    repo.upsert(offense(2024, "KAN", 385), false).await.unwrap();
    repo.upsert(offense(2024, "BUF", 525), true).await.unwrap();

    let older = repo.find_by_season(2023, None).await.unwrap();
    assert_eq!(older.len(), 1);
    assert!(older.iter().all(|row| row.record().season == 2023));
    assert_eq!(older[0].record().points, Some(371));

    let newer = repo.find_by_season(2024, None).await.unwrap();
    assert_eq!(newer.len(), 2);
    assert!(newer.iter().all(|row| row.record().season == 2024));

    assert_eq!(repo.count_by_season(2023, None).await.unwrap(), 1);
    assert_eq!(repo.count_by_season(2024, None).await.unwrap(), 2);
}

#[tokio::test]
async fn list_pages_through_every_season_in_insertion_order() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut repo = Repository::<TeamOffense>::new(&mut session);
    for (season, team) in [(2022, "KAN"), (2023, "KAN"), (2024, "KAN"), (2024, "BUF")] {
        repo.upsert(offense(season, team, 400), false).await.unwrap();
    }
    session.commit().await.unwrap();

    let mut repo = Repository::<TeamOffense>::new(&mut session);
    let first = repo.list(3, 0).await.unwrap();
    let seasons: Vec<i32> = first.iter().map(|row| row.record().season).collect();
    assert_eq!(seasons, [2022, 2023, 2024]);
    let rest = repo.list(3, 3).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].record().team, "BUF");
    assert!(repo.list(10, 4).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_rewrites_the_row_in_place() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut repo = Repository::<TeamOffense>::new(&mut session);
    let mut stored = repo.create(offense(2024, "KAN", 385), true).await.unwrap();
    repo.create(offense(2024, "BUF", 525), true).await.unwrap();

    stored.record_mut().points = Some(386);
    stored.record_mut().plays = Some(1050);
    let id = stored.id();
    let updated = repo.update(stored, true).await.unwrap();
    assert_eq!(updated.id(), id);

    let reloaded = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(reloaded.record().points, Some(386));
    assert_eq!(reloaded.record().plays, Some(1050));
    assert_eq!(repo.count_by_season(2024, None).await.unwrap(), 2);

    let mut clash = reloaded.clone();
    clash.record_mut().team = "BUF".to_string();
    assert!(matches!(
        repo.update(clash, true).await,
        Err(PersistenceError::ConstraintViolation { table: "team_offense", .. })
    ));

    repo.delete(reloaded.clone(), true).await.unwrap();
    assert!(matches!(
        repo.update(reloaded, true).await,
        Err(PersistenceError::Unmapped { table: "team_offense", .. })
    ));
}

#[tokio::test]
async fn weather_lookups_by_game_and_outdoor_week() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut repo = Repository::<GameWeather>::new(&mut session);
    repo.upsert(weather(5, "Green Bay Packers", false, Some(32.0)), false)
        .await
        .unwrap();
    repo.upsert(weather(5, "Detroit Lions", true, None), false).await.unwrap();
    repo.upsert(weather(5, "Buffalo Bills", false, Some(41.5)), false)
        .await
        .unwrap();
    repo.upsert(weather(6, "Chicago Bears", false, Some(50.0)), true)
        .await
        .unwrap();

    let outdoor = repo.outdoor_games(2024, 5).await.unwrap();
    let teams: Vec<&str> = outdoor.iter().map(|row| row.record().team.as_str()).collect();
    assert_eq!(teams, ["Buffalo Bills", "Green Bay Packers"]);

    let dome = repo.for_game(2024, 5, "Detroit Lions").await.unwrap().unwrap();
    assert!(dome.record().is_dome);
    assert_eq!(dome.record().temperature, None);
    assert!(repo.for_game(2024, 6, "Detroit Lions").await.unwrap().is_none());
    assert_eq!(repo.count_by_season(2024, Some(5)).await.unwrap(), 3);
}

#[tokio::test]
async fn injury_reports_are_keyed_by_week() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut repo = Repository::<InjuryReport>::new(&mut session);
    repo.upsert(injury(1, "KAN", "Travis Kelce", "Questionable"), false)
        .await
        .unwrap();
    repo.upsert(injury(2, "KAN", "Travis Kelce", "Out"), false).await.unwrap();
    repo.upsert(injury(2, "KAN", "Isiah Pacheco", "IR"), false).await.unwrap();
    repo.upsert(injury(2, "KAN", "Travis Kelce", "Doubtful"), true)
        .await
        .unwrap();

    let week_two = repo.for_team(2024, 2, "KAN").await.unwrap();
    let players: Vec<&str> = week_two.iter().map(|row| row.record().player.as_str()).collect();
    assert_eq!(players, ["Isiah Pacheco", "Travis Kelce"]);
    assert_eq!(week_two[1].record().designation.as_deref(), Some("Doubtful"));

    let kelce = repo.for_player(2024, "Travis Kelce").await.unwrap();
    let weeks: Vec<i32> = kelce.iter().map(|row| row.record().week).collect();
    assert_eq!(weeks, [1, 2]);
}

#[tokio::test]
async fn uncommitted_writes_vanish_on_rollback() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    {
        let mut repo = Repository::<TeamOffense>::new(&mut session);
        repo.create(offense(2023, "BUF", 451), false).await.unwrap();
        assert_eq!(repo.count_by_season(2023, None).await.unwrap(), 1);
    }
    assert!(session.in_transaction());
    session.rollback().await.unwrap();

    let mut other = factory.open();
    let mut repo = Repository::<TeamOffense>::new(&mut other);
    assert_eq!(repo.count_by_season(2023, None).await.unwrap(), 0);
}

#[tokio::test]
async fn week_filter_applies_only_to_week_keyed_tables() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    {
        let mut games = Repository::<Games>::new(&mut session);
        games.upsert(game(2024, 1, "KAN"), false).await.unwrap();
        games.upsert(game(2024, 1, "PHI"), false).await.unwrap();
        games.upsert(game(2024, 2, "KAN"), false).await.unwrap();
        games.upsert(game(2024, 2, "KAN"), false).await.unwrap();
    }
    session.commit().await.unwrap();

    let mut games = Repository::<Games>::new(&mut session);
    assert_eq!(games.find_by_season(2024, Some(1)).await.unwrap().len(), 2);
    assert_eq!(games.count_by_season(2024, Some(2)).await.unwrap(), 1);
    assert_eq!(games.count_by_season(2024, None).await.unwrap(), 3);

    let mut passing = Repository::<Passing>::new(&mut session);
    assert!(matches!(
        passing.find_by_season(2024, Some(1)).await,
        Err(PersistenceError::InvalidFilter { column: "week", .. })
    ));
}

#[tokio::test]
async fn job_rows_track_progress() {
    let (_dir, factory) = fresh_store().await;
    let mut session = factory.open();
    let mut store = JobStore::new(&mut session);

    let mut job = ScrapeJob::new(2024, vec!["team_offense".into(), "bogus_stat".into()], false);
    job.start(Utc::now()).unwrap();
    let id = store.insert(&mut job, true).await.unwrap();
    assert_eq!(job.id, Some(id));

    job.record(StatResult::success("team_offense", 32)).unwrap();
    store.update(&job, true).await.unwrap();
    job.record(StatResult::failed("bogus_stat", "unknown stat type: bogus_stat"))
        .unwrap();
    job.finish(Utc::now()).unwrap();
    store.update(&job, true).await.unwrap();

    let loaded = store.get(id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::CompletedWithErrors);
    assert_eq!(loaded.results, job.results);
    assert_eq!(loaded.requested_stats, job.requested_stats);
    assert!(loaded.finished_at.is_some());

    let failed_only = store
        .list(Some(JobStatus::CompletedWithErrors), 10)
        .await
        .unwrap();
    assert_eq!(failed_only.len(), 1);
    assert!(store.list(Some(JobStatus::Running), 10).await.unwrap().is_empty());
    assert!(store.get(id + 1).await.unwrap().is_none());

    let unsaved = ScrapeJob::new(2024, vec![], false);
    assert!(matches!(
        store.update(&unsaved, true).await,
        Err(PersistenceError::Unsaved { .. })
    ));
}

#[tokio::test]
async fn upgrade_is_idempotent_and_creates_every_table() {
    let (_dir, factory) = fresh_store().await;
    let ledger = MigrationLedger::baseline().unwrap();
    assert_eq!(
        ledger.current_revision(factory.pool()).await.unwrap().as_deref(),
        Some(ledger.head())
    );

    let report = ledger.upgrade_to_head(factory.pool()).await.unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(report.from.as_deref(), Some(ledger.head()));

    ledger
        .verify_tables(factory.pool(), RECORD_TABLES.into_iter().chain([JOBS_TABLE]))
        .await
        .unwrap();
    assert!(matches!(
        ledger.verify_tables(factory.pool(), ["injuries"]).await,
        Err(MigrationError::MissingTable(_))
    ));
}

#[tokio::test]
async fn fresh_store_reports_no_revision_until_upgraded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("bare.db").display());
    let factory = SessionFactory::connect(&url).await.unwrap();
    let ledger = MigrationLedger::baseline().unwrap();

    assert_eq!(ledger.current_revision(factory.pool()).await.unwrap(), None);
    let report = ledger.upgrade_to_head(factory.pool()).await.unwrap();
    assert_eq!(report.from, None);
    assert_eq!(report.applied.len(), 7);
    assert_eq!(report.to, "007_game_weather");
}
