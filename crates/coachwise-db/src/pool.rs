//! Connection pool, schema migrations, and first-run bootstrap of the
//! exercise store.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, FromRow, PgExecutor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/coachwise-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pool on the exercise store.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to exercise store at {}", config.database_url))
}

/// Newest schema version compiled into this binary.
pub fn schema_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Bring the `exercises` and `exercise_sets` schema up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to migrate exercise schema")?;

    info!(version = ?schema_version(), "exercise schema up to date");
    Ok(())
}

/// Outcome of [`ensure_database_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseStatus {
    Created,
    AlreadyPresent,
}

/// Database name from `config`, checked to be safe to splice into
/// `CREATE DATABASE`, which takes no bind parameters.
fn creatable_database_name(config: &DbConfig) -> Result<&str> {
    let Some(name) = config.database_name() else {
        bail!("could not determine database name from {}", config.database_url);
    };
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("database name {name:?} is not a plain identifier");
    }
    Ok(name)
}

/// Create the target database through the server's `postgres` maintenance
/// database unless it is already there.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<DatabaseStatus> {
    let db_name = creatable_database_name(config)?;
    let maintenance_url = config.maintenance_url();

    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let present: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to look up database")?;

    let status = if present {
        DatabaseStatus::AlreadyPresent
    } else {
        maint_pool
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        DatabaseStatus::Created
    };

    maint_pool.close().await;
    info!(db = db_name, ?status, "exercise store database ready");
    Ok(status)
}

/// Row counts across the exercise aggregate, as reported by `db-init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct StoreSummary {
    pub exercises: i64,
    /// Exercises with no owner.
    pub shared_exercises: i64,
    pub public_exercises: i64,
    pub sets: i64,
}

/// Count exercises (total, shared, public) and sets in one round trip.
pub async fn store_summary(executor: impl PgExecutor<'_>) -> Result<StoreSummary> {
    sqlx::query_as::<_, StoreSummary>(
        "SELECT \
           (SELECT COUNT(*) FROM exercises) AS exercises, \
           (SELECT COUNT(*) FROM exercises WHERE owner_id IS NULL) AS shared_exercises, \
           (SELECT COUNT(*) FROM exercises WHERE public) AS public_exercises, \
           (SELECT COUNT(*) FROM exercise_sets) AS sets",
    )
    .fetch_one(executor)
    .await
    .context("failed to summarize exercise store")
}
