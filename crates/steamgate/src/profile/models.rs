//! Profile data models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A player summary as returned by `ISteamUser/GetPlayerSummaries`.
#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    pub steamid: String,
    #[serde(default)]
    pub personaname: String,
    #[serde(default)]
    pub profileurl: String,
    #[serde(default)]
    pub avatarfull: String,
}

/// Envelope of the `GetPlayerSummaries` response.
#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesResponse {
    pub response: PlayerSummaries,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlayerSummaries {
    #[serde(default)]
    pub players: Vec<Player>,
}

/// Persisted match statistics for one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PlayerStats {
    pub kills: i64,
    pub deaths: i64,
    pub headshots: i64,
}

impl PlayerStats {
    /// Percentage of kills that were headshots.
    pub fn headshot_rate(&self) -> i64 {
        headshot_rate(self.kills, self.headshots)
    }
}

/// Public profile served to authenticated players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub url: String,
    pub avatar: String,
    pub kills: i64,
    pub deaths: i64,
    pub headshot_rate: i64,
}

impl Profile {
    pub fn new(player: Player, stats: PlayerStats) -> Self {
        Self {
            id: player.steamid,
            name: player.personaname,
            url: player.profileurl,
            avatar: player.avatarfull,
            kills: stats.kills,
            deaths: stats.deaths,
            headshot_rate: stats.headshot_rate(),
        }
    }
}

/// `round(headshots / kills * 100)`, or 0 without any kills.
pub fn headshot_rate(kills: i64, headshots: i64) -> i64 {
    if kills <= 0 {
        return 0;
    }
    (headshots as f64 / kills as f64 * 100.0).round() as i64
}
