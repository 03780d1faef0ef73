//! Database migrations.
//!
//! Applies `crates/server/migrations/` and creates the session store table.
//! The server never migrates on startup; run this before the first start and
//! after every upgrade.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Run every pending migration.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running application migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Creating session store...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
