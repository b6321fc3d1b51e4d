//! Player statistics repository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::error::ProfileResult;
use super::models::PlayerStats;
use crate::auth::Identity;

/// Read access to persisted player statistics.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Statistics for `steam_id`; all zeros for a player with no row yet.
    async fn stats_for(&self, steam_id: &Identity) -> ProfileResult<PlayerStats>;
}

/// SQLite-backed statistics store.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(test)]
impl StatsRepository {
    /// Insert or replace the statistics row for a player.
    #[instrument(skip(self, stats), fields(steam_id = %steam_id))]
    pub(crate) async fn upsert(&self, steam_id: &Identity, stats: PlayerStats) -> ProfileResult<()> {
        sqlx::query(
            r#"
            INSERT INTO player_stats (steam_id, kills, deaths, headshots, updated_at)
            VALUES (?, ?, ?, ?, datetime('now'))
            ON CONFLICT(steam_id) DO UPDATE SET
                kills = excluded.kills,
                deaths = excluded.deaths,
                headshots = excluded.headshots,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(steam_id.as_str())
        .bind(stats.kills)
        .bind(stats.deaths)
        .bind(stats.headshots)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StatsStore for StatsRepository {
    #[instrument(skip(self), fields(steam_id = %steam_id))]
    async fn stats_for(&self, steam_id: &Identity) -> ProfileResult<PlayerStats> {
        let stats = sqlx::query_as::<_, PlayerStats>(
            "SELECT kills, deaths, headshots FROM player_stats WHERE steam_id = ?",
        )
        .bind(steam_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if stats.is_none() {
            debug!("No statistics recorded yet");
        }

        Ok(stats.unwrap_or_default())
    }
}
