//! SQLite connection pool factory and schema bootstrap.

use std::str::FromStr;

use anyhow::Context;
use shelf_kernel::{settings::DatabaseSettings, TableSchema};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// Open a connection pool for the configured database.
///
/// A file database is created when missing. An in-memory database lives
/// only as long as its connection, so the pool is pinned to one connection
/// that is never recycled.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let pool = pool_options(settings)
        .connect_with(connect_options(settings)?)
        .await
        .with_context(|| format!("failed to connect to '{}'", settings.url))?;

    tracing::info!(
        target: "shelf-db",
        url = %settings.url,
        in_memory = settings.is_in_memory(),
        "database pool ready"
    );

    Ok(pool)
}

/// Build a pool without opening any connection until first use.
pub fn connect_lazy(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    Ok(pool_options(settings).connect_lazy_with(connect_options(settings)?))
}

fn connect_options(settings: &DatabaseSettings) -> anyhow::Result<SqliteConnectOptions> {
    Ok(SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true))
}

fn pool_options(settings: &DatabaseSettings) -> SqlitePoolOptions {
    if settings.is_in_memory() {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
    }
}

/// Apply each module's table definitions in order. Statements are expected
/// to be idempotent (`CREATE ... IF NOT EXISTS`).
pub async fn ensure_schema(
    pool: &SqlitePool,
    schema: &[(&'static str, TableSchema)],
) -> anyhow::Result<()> {
    for (module, table) in schema {
        tracing::debug!(target: "shelf-db", module, table = table.name, "applying table schema");

        sqlx::raw_sql(table.ddl)
            .execute(pool)
            .await
            .with_context(|| {
                format!(
                    "failed to apply schema for table '{}' of module '{}'",
                    table.name, module
                )
            })?;
    }

    tracing::info!(target: "shelf-db", tables = schema.len(), "schema is up to date");
    Ok(())
}
