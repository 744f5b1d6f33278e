use crate::postgres::PostgresClient;
use anyhow::{Context, Result};
use tracing::info;

/// Schema migrations embedded at build time, applied in order
const MIGRATIONS: &[(i32, &str, &str)] = &[
    (
        1,
        "create_devices",
        include_str!("../../migrations/0001_create_devices.sql"),
    ),
    (
        2,
        "create_telemetry",
        include_str!("../../migrations/0002_create_telemetry.sql"),
    ),
];

/// Apply every migration not yet recorded in `warmhouse.schema_migrations`
pub async fn run_migrations(client: &PostgresClient) -> Result<()> {
    let mut conn = client.get_connection().await?;

    conn.batch_execute(
        "CREATE SCHEMA IF NOT EXISTS warmhouse;
         CREATE TABLE IF NOT EXISTS warmhouse.schema_migrations (
             version INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
         );",
    )
    .await
    .context("failed to create migrations table")?;

    for (version, name, sql) in MIGRATIONS {
        let applied = conn
            .query_opt(
                "SELECT version FROM warmhouse.schema_migrations WHERE version = $1",
                &[version],
            )
            .await?
            .is_some();
        if applied {
            continue;
        }

        let tx = conn.transaction().await?;
        tx.batch_execute(sql)
            .await
            .with_context(|| format!("migration {version} ({name}) failed"))?;
        tx.execute(
            "INSERT INTO warmhouse.schema_migrations (version, name) VALUES ($1, $2)",
            &[version, name],
        )
        .await?;
        tx.commit().await?;

        info!(version = version, name = %name, "applied migration");
    }

    Ok(())
}
