mod db_url;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use api::{ApiState, router};
use clap::{Parser, Subcommand};
use services::{AppServices, Clock, JudgeConfig};
use storage::repository::Storage;
use storage::seed::seed_sample_catalog;
use storage::sqlite::SqliteRepository;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::db_url::{normalize_sqlite_url, prepare_sqlite_file};

const DEFAULT_LOG_FILTER: &str = "mentor=info,services=info,api=info";

#[derive(Parser, Debug)]
#[command(version, about = "Proctored exam engine")]
struct Cli {
    /// SQLite database URL or path.
    #[arg(long = "db", env = "MENTOR_DB_URL", default_value = "sqlite://mentor.sqlite3", global = true)]
    db_url: String,

    /// Address the HTTP API binds to.
    #[arg(long, env = "MENTOR_BIND", default_value = "127.0.0.1:8080", global = true)]
    bind: SocketAddr,

    /// Base URL of the code runner used to judge coding and SQL answers.
    #[arg(long, env = "MENTOR_JUDGE_URL", global = true)]
    judge_url: Option<String>,

    /// Seconds a single code answer may wait for the judge.
    #[arg(long, env = "MENTOR_JUDGE_TIMEOUT_SECS", default_value_t = 15, global = true)]
    judge_timeout_secs: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Insert a sample published test.
    Seed,
    /// Apply schema migrations and exit.
    Migrate,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(db_url: &str, bind: SocketAddr, judge: Option<JudgeConfig>) -> anyhow::Result<()> {
    let services = AppServices::new_sqlite(db_url, Clock::system(), judge)
        .await
        .context("opening storage")?;
    let app = router(ApiState { services });

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(address = %bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("serving http")?;
    Ok(())
}

async fn seed(db_url: &str) -> anyhow::Result<()> {
    let storage = Storage::sqlite(db_url).await.context("opening storage")?;
    let test_id = seed_sample_catalog(&storage, Clock::system().now())
        .await
        .context("seeding sample catalog")?;
    info!(test_id = %test_id, "sample test seeded");
    Ok(())
}

async fn migrate(db_url: &str) -> anyhow::Result<()> {
    let repo = SqliteRepository::connect(db_url)
        .await
        .context("connecting")?;
    repo.migrate().await.context("migrating")?;
    info!("migrations applied");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    info!(db = %db_url, "using database");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let judge = cli.judge_url.and_then(JudgeConfig::new).map(|config| {
                config.with_timeout(Duration::from_secs(cli.judge_timeout_secs))
            });
            serve(&db_url, cli.bind, judge).await
        }
        Command::Seed => seed(&db_url).await,
        Command::Migrate => migrate(&db_url).await,
    }
}
