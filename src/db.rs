use std::{path::Path, str::FromStr};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub type DbPool = SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    ensure_parent_dir(database_url).await?;

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // An in-memory database lives exactly as long as its single connection.
    let pool = if is_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    tracing::info!("Connected to database");
    Ok(pool)
}

pub async fn migrate(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

pub async fn ping(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

fn is_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

async fn ensure_parent_dir(database_url: &str) -> Result<(), sqlx::Error> {
    if is_memory(database_url) {
        return Ok(());
    }
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> DbPool {
    let pool = connect("sqlite::memory:").await.expect("in-memory database");
    migrate(&pool).await.expect("migrations apply");
    pool
}
