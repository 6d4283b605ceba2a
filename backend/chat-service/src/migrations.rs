use sqlx::{Executor, Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("../migrations/0001_create_users.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_channels.sql");
const MIG_0003: &str = include_str!("../migrations/0003_create_channel_members.sql");
const MIG_0004: &str = include_str!("../migrations/0004_create_messages.sql");
const MIG_0005: &str = include_str!("../migrations/0005_create_favorites.sql");

/// Every statement is IF NOT EXISTS, so reruns are no-ops and any
/// execution error is real schema drift. Errors abort startup.
pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    for (i, sql) in [MIG_0001, MIG_0002, MIG_0003, MIG_0004, MIG_0005]
        .into_iter()
        .enumerate()
    {
        let label = i + 1;
        // Raw execution so files holding several statements run whole.
        if let Err(e) = db.execute(sql).await {
            tracing::error!(migration = %label, error = %e, "migration failed");
            return Err(e);
        }
        tracing::info!(migration = %label, "migration applied");
    }
    Ok(())
}
