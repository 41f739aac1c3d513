use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridiron_storage::{open_migrated, MigrationLedger, SessionFactory, JOBS_TABLE};
use gridiron_sync::{BatchOrchestrator, ScrapeConfig};
use gridiron_web::{AppState, WebConfig};
use serde_json::json;
use tracing::info;

const DEFAULT_LOG_FILTER: &str =
    "gridiron=info,gridiron_sync=info,gridiron_web=info,gridiron_storage=info";

#[derive(Debug, Parser)]
#[command(name = "gridiron")]
#[command(about = "Gridiron season stats scraper and API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bring the schema to head, check every table, then serve HTTP.
    Serve,
    /// Apply pending schema revisions.
    Migrate,
    /// Print the current schema revision.
    Revision,
    /// Run one batch and print its results.
    Scrape {
        season: i32,
        #[arg(long = "stat")]
        stats: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ScrapeConfig::from_env().context("loading scrape config")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config).await?,
        Commands::Migrate => {
            let factory = connect(&config).await?;
            let report = MigrationLedger::baseline()?
                .upgrade_to_head(factory.pool())
                .await
                .context("applying schema revisions")?;
            println!(
                "schema at {} ({} applied, was {})",
                report.to,
                report.applied.len(),
                report.from.as_deref().unwrap_or("base")
            );
        }
        Commands::Revision => {
            let factory = connect(&config).await?;
            let current = MigrationLedger::baseline()?
                .current_revision(factory.pool())
                .await
                .context("reading schema revision")?;
            println!("{}", current.as_deref().unwrap_or("base"));
        }
        Commands::Scrape {
            season,
            stats,
            dry_run,
        } => {
            let sessions = open_migrated(&config.database_url).await?;
            let orchestrator = BatchOrchestrator::from_config(&config)?;
            let mut session = sessions.open();
            let job = orchestrator
                .run_batch(&mut session, season, stats, dry_run)
                .await;
            let report = json!({
                "season": season,
                "status": job.status,
                "results": job.results,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn connect(config: &ScrapeConfig) -> Result<SessionFactory> {
    SessionFactory::connect(&config.database_url)
        .await
        .with_context(|| format!("connecting to {}", config.database_url))
}

/// Refuses to bind the listener unless every registered table exists.
async fn serve(config: &ScrapeConfig) -> Result<()> {
    let sessions = open_migrated(&config.database_url).await?;
    let orchestrator = BatchOrchestrator::from_config(config).context("building scrape runtime")?;
    let tables = orchestrator.registry().tables();
    MigrationLedger::baseline()?
        .verify_tables(sessions.pool(), tables.into_iter().chain([JOBS_TABLE]))
        .await
        .context("schema check before serving")?;
    info!(
        backend = ?config.backend,
        workers = orchestrator.bridge().size(),
        stats = orchestrator.registry().len(),
        "scrape runtime ready"
    );

    let web = WebConfig::from_env();
    let state = AppState::new(sessions, orchestrator, web.api_key.clone());
    gridiron_web::serve(&web, state).await
}
