//! Steam OpenID 2.0 sign-in.
//!
//! Provides:
//! - Redirect construction for the `checkid_setup` request
//! - Callback validation via a `check_authentication` round trip

mod error;
mod transport;
mod validator;

pub use error::{OpenIdError, OpenIdResult};
pub use transport::{HttpTransport, VerificationTransport};
pub use validator::{OpenIdValidator, STEAM_OPENID_ENDPOINT};
