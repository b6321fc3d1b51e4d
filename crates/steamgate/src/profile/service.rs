//! Profile service combining Steam summaries with local statistics.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use super::error::ProfileResult;
use super::models::Profile;
use super::repository::StatsStore;
use super::steam::SteamClient;
use crate::auth::Identity;

/// Something that can produce the profile of an authenticated player.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn profile(&self, steam_id: &Identity) -> ProfileResult<Profile>;
}

/// Profile provider backed by the Steam Web API and a stats store.
#[derive(Clone)]
pub struct ProfileService {
    steam: SteamClient,
    stats: Arc<dyn StatsStore>,
}

impl ProfileService {
    pub fn new(steam: SteamClient, stats: Arc<dyn StatsStore>) -> Self {
        Self { steam, stats }
    }
}

#[async_trait]
impl ProfileProvider for ProfileService {
    #[instrument(skip(self), fields(steam_id = %steam_id))]
    async fn profile(&self, steam_id: &Identity) -> ProfileResult<Profile> {
        let (player, stats) = tokio::try_join!(
            self.steam.player_summary(steam_id),
            self.stats.stats_for(steam_id),
        )?;

        Ok(Profile::new(player, stats))
    }
}
