//! Steam Web API client.

use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::{ProfileError, ProfileResult};
use super::models::{Player, PlayerSummariesResponse};
use crate::auth::Identity;

/// Default Steam Web API base URL.
pub const STEAM_API_BASE_URL: &str = "https://api.steampowered.com";

const PLAYER_SUMMARIES_PATH: &str = "ISteamUser/GetPlayerSummaries/v0002/";

/// Client for the Steam Web API.
#[derive(Clone)]
pub struct SteamClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for SteamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SteamClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SteamClient {
    pub fn new(base_url: Url, api_key: impl Into<String>, timeout: Duration) -> ProfileResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    fn with_client(client: Client, mut base_url: Url, api_key: impl Into<String>) -> Self {
        // Url::join drops the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Fetch the public summary of one player.
    #[instrument(skip(self), fields(steam_id = %steam_id))]
    pub async fn player_summary(&self, steam_id: &Identity) -> ProfileResult<Player> {
        let url = self
            .base_url
            .join(PLAYER_SUMMARIES_PATH)
            .map_err(|e| ProfileError::Steam(format!("building request URL: {e}")))?;

        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("steamids", steam_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        debug!(%status, "player summaries response received");
        if !status.is_success() {
            return Err(ProfileError::Steam(format!(
                "Steam Web API answered with status {status}"
            )));
        }

        let summaries: PlayerSummariesResponse = response
            .json()
            .await
            .map_err(|e| ProfileError::Steam(format!("parsing player summaries: {e}")))?;

        summaries
            .response
            .players
            .into_iter()
            .find(|player| player.steamid == steam_id.as_str())
            .ok_or_else(|| ProfileError::PlayerNotFound(steam_id.to_string()))
    }
}
