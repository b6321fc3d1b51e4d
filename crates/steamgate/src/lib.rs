//! Steam OpenID sign-in with signed session tokens.
//!
//! Players sign in through Steam Community's OpenID 2.0 endpoint and receive
//! an HS256 access/refresh token pair. Protected endpoints verify the bearer
//! token without any database lookup.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod openid;
pub mod profile;
