//! HTTP API module.

mod docs;
mod error;
mod handlers;
mod routes;
mod state;

pub use docs::ApiDoc;
pub use error::{ApiError, ApiResult, EXPIRED_TOKEN_CODE, ErrorResponse};
pub use handlers::{HealthResponse, RefreshForm};
pub use routes::create_router;
pub use state::{AppState, DEFAULT_REQUEST_TIMEOUT};
