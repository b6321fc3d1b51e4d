//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthState, TokenGenerator};
use crate::openid::OpenIdValidator;
use crate::profile::ProfileProvider;

/// Default upper bound for handling one request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token verification for the gate.
    pub auth: AuthState,
    /// Steam OpenID redirect and callback validation.
    pub openid: Arc<OpenIdValidator>,
    /// Session token minting.
    pub tokens: Arc<dyn TokenGenerator>,
    /// Player profile lookup.
    pub profiles: Arc<dyn ProfileProvider>,
    /// Origins allowed to call the API cross-origin.
    pub allowed_origins: Vec<String>,
    /// Upper bound for handling one request.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        auth: AuthState,
        openid: OpenIdValidator,
        tokens: Arc<dyn TokenGenerator>,
        profiles: Arc<dyn ProfileProvider>,
    ) -> Self {
        Self {
            auth,
            openid: Arc::new(openid),
            tokens,
            profiles,
            allowed_origins: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
