//! Player profile module.
//!
//! Combines the public Steam player summary with locally recorded match
//! statistics.

mod error;
mod models;
mod repository;
mod service;
mod steam;

pub use error::{ProfileError, ProfileResult};
pub use models::{Player, PlayerStats, Profile, headshot_rate};
pub use repository::{StatsRepository, StatsStore};
pub use service::{ProfileProvider, ProfileService};
pub use steam::{STEAM_API_BASE_URL, SteamClient};
